//! The article body as an owned DOM fragment.
//!
//! A [`ContentSubtree`] is never edited after it is handed out. Rewriting
//! image sources clones the parsed tree and changes the `src` attributes of
//! the copy, so text and whitespace reach the converter exactly as parsed.

use crate::models::{AssetMapping, AssetReference};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

/// The DOM fragment holding just the article's readable body.
#[derive(Debug, Clone)]
pub struct ContentSubtree {
    fragment: Html,
}

impl ContentSubtree {
    /// Parse an HTML fragment.
    pub fn parse(html: &str) -> Self {
        Self {
            fragment: Html::parse_fragment(html),
        }
    }

    /// Copy the children of `root`, dropping every element matching `exclude`.
    pub fn from_element(root: ElementRef<'_>, exclude: Option<&Selector>) -> Self {
        let mut fragment = Html::parse_fragment(&root.inner_html());
        if let Some(exclude) = exclude {
            let excluded: Vec<_> = fragment.select(exclude).map(|e| e.id()).collect();
            for id in excluded {
                if let Some(mut node) = fragment.tree.get_mut(id) {
                    node.detach();
                }
            }
        }
        Self { fragment }
    }

    /// The fragment's root element; its children are the article body.
    pub fn root(&self) -> ElementRef<'_> {
        self.fragment.root_element()
    }

    /// Serialize the body back to HTML.
    pub fn html(&self) -> String {
        self.root().inner_html()
    }

    /// Every image with a `src`, in document order.
    pub fn images(&self) -> Vec<AssetReference> {
        self.root()
            .select(&IMG)
            .filter_map(|img| {
                let src = img.value().attr("src")?;
                Some(AssetReference {
                    original_url: src.to_string(),
                    hint: img.value().attr("alt").unwrap_or_default().to_string(),
                })
            })
            .collect()
    }

    /// A new subtree in which each image `src` found in `mapping` is replaced
    /// by its local name. Sources missing from the mapping are kept.
    pub fn with_image_sources(&self, mapping: &AssetMapping) -> Self {
        if mapping.is_empty() {
            return self.clone();
        }

        let mut fragment = self.fragment.clone();
        let rewrites: Vec<_> = fragment
            .select(&IMG)
            .filter_map(|img| {
                let local = mapping.get(img.value().attr("src")?)?;
                Some((img.id(), local.to_string()))
            })
            .collect();

        for (id, local) in rewrites {
            let Some(mut node) = fragment.tree.get_mut(id) else {
                continue;
            };
            let Node::Element(element) = node.value() else {
                continue;
            };
            for (name, value) in element.attrs.iter_mut() {
                if &*name.local == "src" {
                    *value = local.as_str().into();
                }
            }
        }
        Self { fragment }
    }
}
