//! HTML to Markdown conversion for the article body.
//!
//! Conversion is delegated to [`htmd`], which follows turndown's CommonMark
//! rules including escaping of markdown-significant text. This module maps
//! the saved style settings onto htmd options and registers the GitHub
//! extensions JueJin articles use: tables, strikethrough and task list
//! checkboxes. Tags in [`ConvertOptions::removed_tags`] (`style` by default)
//! are dropped together with their content.
//!
//! Conversion is pure: the same subtree always yields the same markdown.

use crate::subtree::ContentSubtree;
use htmd::{
    Element, HtmlToMarkdown, HtmlToMarkdownBuilder,
    element_handler::{HandlerResult, Handlers},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Starts one encoded table cell inside converted table content.
const CELL: char = '\u{1f}';
/// Starts one encoded table row inside converted table content.
const ROW: char = '\u{1e}';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HeadingStyle {
    /// `# Title`
    #[default]
    Atx,
    /// `Title` underlined with `=` or `-`; levels 3 and deeper fall back to ATX.
    Setext,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CodeBlockStyle {
    #[default]
    Fenced,
    Indented,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub heading_style: HeadingStyle,
    pub code_block_style: CodeBlockStyle,
    /// `-` or `*`.
    pub bullet_list_marker: char,
    pub tables: bool,
    pub strikethrough: bool,
    pub task_lists: bool,
    /// Tags dropped from the output together with their content.
    pub removed_tags: Vec<&'static str>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            bullet_list_marker: '-',
            tables: true,
            strikethrough: true,
            task_lists: true,
            removed_tags: vec!["style"],
        }
    }
}

impl ConvertOptions {
    fn htmd_options(&self) -> htmd::options::Options {
        htmd::options::Options {
            heading_style: match self.heading_style {
                HeadingStyle::Atx => htmd::options::HeadingStyle::Atx,
                HeadingStyle::Setext => htmd::options::HeadingStyle::Setex,
            },
            bullet_list_marker: match self.bullet_list_marker {
                '*' => htmd::options::BulletListMarker::Asterisk,
                _ => htmd::options::BulletListMarker::Dash,
            },
            code_block_style: match self.code_block_style {
                CodeBlockStyle::Fenced => htmd::options::CodeBlockStyle::Fenced,
                CodeBlockStyle::Indented => htmd::options::CodeBlockStyle::Indented,
            },
            code_block_fence: htmd::options::CodeBlockFence::Backticks,
            ..Default::default()
        }
    }
}

pub struct MarkdownConverter {
    converter: HtmlToMarkdown,
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

impl MarkdownConverter {
    pub fn new(options: ConvertOptions) -> Self {
        Self::with_handlers(options, |builder| builder)
    }

    /// Build a converter and let `extend` register extra element handlers.
    /// Handlers added by `extend` win over the built-in ones for the same tag.
    pub fn with_handlers(
        options: ConvertOptions,
        extend: impl FnOnce(HtmlToMarkdownBuilder) -> HtmlToMarkdownBuilder,
    ) -> Self {
        let mut builder = HtmlToMarkdown::builder()
            .skip_tags(options.removed_tags.clone())
            .options(options.htmd_options());

        if options.strikethrough {
            builder = builder.add_handler(vec!["del", "s", "strike"], strikethrough);
        }
        if options.task_lists {
            builder = builder.add_handler(vec!["input"], task_checkbox);
        }
        if options.tables {
            builder = builder
                .add_handler(vec!["table"], table)
                .add_handler(vec!["thead"], table_head)
                .add_handler(vec!["tbody", "tfoot"], table_section)
                .add_handler(vec!["tr"], table_row)
                .add_handler(vec!["th"], header_cell)
                .add_handler(vec!["td"], data_cell);
        }

        Self {
            converter: extend(builder).build(),
        }
    }

    /// Convert the subtree's body to markdown.
    pub fn convert(&self, subtree: &ContentSubtree) -> String {
        match self.converter.convert(&subtree.html()) {
            Ok(markdown) => markdown.trim_matches('\n').to_string(),
            Err(e) => {
                warn!(error = %e, "Markdown conversion failed; producing an empty note");
                String::new()
            }
        }
    }
}

fn translated(content: String) -> Option<HandlerResult> {
    Some(HandlerResult {
        content,
        markdown_translated: true,
    })
}

fn attr(element: &Element, name: &str) -> Option<String> {
    element
        .attrs
        .iter()
        .find(|a| a.name.local.to_string() == name)
        .map(|a| a.value.to_string())
}

fn strikethrough(handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    let content = handlers.walk_children(element.node).content;
    if content.trim().is_empty() {
        return translated(content);
    }
    translated(format!("~~{content}~~"))
}

fn task_checkbox(handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    let checkbox = attr(&element, "type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox"));
    if !checkbox {
        return handlers.fallback(element);
    }
    let checked = attr(&element, "checked").is_some();
    translated(if checked { "[x]" } else { "[ ]" }.to_string())
}

// Table parts are converted bottom up. Cells and rows are tagged with
// control characters so the `table` handler can lay out the whole grid.

fn header_cell(handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    table_cell(handlers, element, 'h')
}

fn data_cell(handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    table_cell(handlers, element, 'd')
}

fn table_cell(handlers: &dyn Handlers, element: Element, kind: char) -> Option<HandlerResult> {
    let align = match attr(&element, "align").map(|a| a.to_ascii_lowercase()).as_deref() {
        Some("left") => 'l',
        Some("right") => 'r',
        Some("center") => 'c',
        _ => '-',
    };
    let content = handlers.walk_children(element.node).content;
    let text = content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|");
    translated(format!("{CELL}{kind}{align}{text}"))
}

fn table_row(handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    let content = handlers.walk_children(element.node).content;
    translated(format!("{ROW}{content}"))
}

fn table_head(handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    let content = handlers.walk_children(element.node).content;
    translated(content.replace(&format!("{CELL}d"), &format!("{CELL}h")))
}

fn table_section(handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    translated(handlers.walk_children(element.node).content)
}

struct Cell {
    header: bool,
    align: char,
    text: String,
}

fn parse_row(encoded: &str) -> Vec<Cell> {
    encoded
        .split(CELL)
        .skip(1)
        .map(|raw| {
            let mut chars = raw.chars();
            let header = chars.next() == Some('h');
            let align = chars.next().unwrap_or('-');
            Cell {
                header,
                align,
                text: chars.as_str().trim().to_string(),
            }
        })
        .collect()
}

fn render_row<'a>(mut texts: impl Iterator<Item = &'a str>, columns: usize) -> String {
    let mut line = String::from("|");
    for _ in 0..columns {
        match texts.next() {
            Some(text) if !text.is_empty() => {
                line.push(' ');
                line.push_str(text);
                line.push_str(" |");
            }
            _ => line.push_str(" |"),
        }
    }
    line
}

fn table(handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    let content = handlers.walk_children(element.node).content;
    let rows: Vec<Vec<Cell>> = content
        .split(ROW)
        .skip(1)
        .map(parse_row)
        .filter(|row| !row.is_empty())
        .collect();
    let Some(columns) = rows.iter().map(Vec::len).max() else {
        return translated(String::new());
    };

    let has_header = rows[0].iter().all(|c| c.header);
    let (header, body) = if has_header {
        (Some(&rows[0]), &rows[1..])
    } else {
        (None, &rows[..])
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(match header {
        Some(cells) => render_row(cells.iter().map(|c| c.text.as_str()), columns),
        None => render_row(std::iter::empty(), columns),
    });

    let aligned = header.unwrap_or(&rows[0]);
    let border = (0..columns)
        .map(|i| match aligned.get(i).map(|c| c.align) {
            Some('l') => ":---",
            Some('r') => "---:",
            Some('c') => ":---:",
            _ => "---",
        })
        .collect::<Vec<_>>()
        .join(" | ");
    lines.push(format!("| {border} |"));

    for row in body {
        lines.push(render_row(row.iter().map(|c| c.text.as_str()), columns));
    }

    translated(format!("\n\n{}\n\n", lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(html: &str) -> String {
        MarkdownConverter::default().convert(&ContentSubtree::parse(html))
    }

    #[test]
    fn test_headings_are_atx() {
        assert_eq!(md("<h1>One</h1><h3> Three </h3>"), "# One\n\n### Three");
    }

    #[test]
    fn test_setext_headings_when_configured() {
        let converter = MarkdownConverter::new(ConvertOptions {
            heading_style: HeadingStyle::Setext,
            ..Default::default()
        });
        let out = converter.convert(&ContentSubtree::parse("<h1>Title</h1><h4>Deep</h4>"));
        assert!(out.starts_with("Title\n="));
        assert!(!out.contains("# Title"));
        assert!(out.contains("#### Deep"));
    }

    #[test]
    fn test_markdown_characters_in_text_are_escaped() {
        assert_eq!(md("<p># x</p>"), "\\# x");
        assert_eq!(md("<p>*a*</p>"), "\\*a\\*");
    }

    #[test]
    fn test_style_content_never_appears() {
        let out = md("<style>.markdown-body{color:red}</style><p>visible</p>");
        assert_eq!(out, "visible");
        assert!(!out.contains("color"));
    }

    #[test]
    fn test_nested_style_is_removed_too() {
        let out = md("<div><p>a</p><div><style>p{}</style></div><p>b</p></div>");
        assert!(!out.contains("p{}"));
        assert!(out.starts_with('a') && out.ends_with('b'));
    }

    #[test]
    fn test_removed_tags_are_configurable() {
        let converter = MarkdownConverter::new(ConvertOptions {
            removed_tags: vec!["style", "script"],
            ..Default::default()
        });
        let out = converter.convert(&ContentSubtree::parse("<script>alert(1)</script><p>ok</p>"));
        assert_eq!(out, "ok");
    }

    #[test]
    fn test_fenced_code_block() {
        let out = md(
            "<pre><code class=\"language-rust\">fn main() {\n    println!(\"hi\");\n}\n</code></pre>",
        );
        assert!(out.starts_with("```"));
        assert!(out.ends_with("```"));
        assert!(out.contains("    println!(\"hi\");"));
    }

    #[test]
    fn test_indented_code_when_configured() {
        let converter = MarkdownConverter::new(ConvertOptions {
            code_block_style: CodeBlockStyle::Indented,
            ..Default::default()
        });
        let out = converter.convert(&ContentSubtree::parse("<p>x</p><pre><code>a\nb</code></pre>"));
        assert!(out.contains("    a\n    b"));
        assert!(!out.contains("```"));
    }

    #[test]
    fn test_inline_formatting() {
        let out = md("<p>Use <code>cargo</code>, <strong>bold</strong> and <del>old</del>.</p>");
        assert!(out.contains("`cargo`"));
        assert!(out.contains("**bold**"));
        assert!(out.contains("~~old~~"));
    }

    #[test]
    fn test_links_and_images() {
        let out = md(
            r#"<p><a href="https://juejin.cn" title="JueJin">site</a> <img src="assets/x.png" alt="x.png"></p>"#,
        );
        assert!(out.contains(r#"[site](https://juejin.cn "JueJin")"#));
        assert!(out.contains("![x.png](assets/x.png)"));
    }

    #[test]
    fn test_unordered_list_uses_configured_marker() {
        let out = md("<ul>\n<li>one</li>\n<li>two</li>\n</ul>");
        for item in ["one", "two"] {
            assert!(out.lines().any(|l| l.starts_with('-') && l.ends_with(item)));
        }

        let converter = MarkdownConverter::new(ConvertOptions {
            bullet_list_marker: '*',
            ..Default::default()
        });
        let out = converter.convert(&ContentSubtree::parse("<ul><li>one</li></ul>"));
        assert!(out.starts_with('*'));
    }

    #[test]
    fn test_task_list_items() {
        let out = md(r#"<ul><li><input type="checkbox" checked> done</li><li><input type="checkbox"> todo</li></ul>"#);
        assert!(out.lines().any(|l| l.contains("[x]") && l.ends_with("done")));
        assert!(out.lines().any(|l| l.contains("[ ]") && l.ends_with("todo")));
    }

    #[test]
    fn test_blockquote() {
        let out = md("<blockquote><p>a</p><p>b</p></blockquote>");
        assert!(out.lines().all(|l| l.starts_with('>')));
    }

    #[test]
    fn test_table_with_header() {
        let out = md(
            "<table><thead><tr><th>Name</th><th align=\"right\">Age</th></tr></thead>\
             <tbody><tr><td>Ann</td><td>3</td></tr><tr><td>B|C</td><td>4</td></tr></tbody></table>",
        );
        assert_eq!(
            out,
            "| Name | Age |\n| --- | ---: |\n| Ann | 3 |\n| B\\|C | 4 |"
        );
    }

    #[test]
    fn test_table_without_header_gets_empty_one() {
        let out = md("<table><tr><td>a</td><td>b</td></tr></table>");
        assert_eq!(out, "| | |\n| --- | --- |\n| a | b |");
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let out = md(
            "<table><tr><th>a</th><th align=\"center\">b</th></tr><tr><td>1</td></tr></table>",
        );
        assert_eq!(out, "| a | b |\n| --- | :---: |\n| 1 | |");
    }

    #[test]
    fn test_disabled_extensions_fall_back_to_text() {
        let converter = MarkdownConverter::new(ConvertOptions {
            strikethrough: false,
            ..Default::default()
        });
        let out = converter.convert(&ContentSubtree::parse("<p><del>old</del> new</p>"));
        assert!(!out.contains("~~"));
        assert!(out.contains("old") && out.contains("new"));
    }

    #[test]
    fn test_custom_handler_takes_precedence() {
        let converter = MarkdownConverter::with_handlers(ConvertOptions::default(), |builder| {
            builder
                .add_handler(vec!["mark"], |handlers: &dyn Handlers, element: Element| {
                    let content = handlers.walk_children(element.node).content;
                    translated(format!("=={content}=="))
                })
                .add_handler(vec!["h1"], |handlers: &dyn Handlers, element: Element| {
                    let content = handlers.walk_children(element.node).content;
                    translated(format!("\n\n## {}\n\n", content.trim()))
                })
        });
        let out = converter.convert(&ContentSubtree::parse("<h1>T</h1><p><mark>hi</mark></p>"));
        assert_eq!(out, "## T\n\n==hi==");
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let subtree = ContentSubtree::parse(
            "<h2>T</h2><p>x <em>y</em></p><ul><li>z</li></ul><img src=\"a.png\" alt=\"\">",
        );
        let converter = MarkdownConverter::default();
        assert_eq!(converter.convert(&subtree), converter.convert(&subtree));
    }
}
