//! Site-specific article locators.
//!
//! A locator turns a raw article page into its sanitized title and a
//! [`ContentSubtree`](crate::subtree::ContentSubtree) holding only the
//! readable body.
//!
//! | Site | Module | Body | Title |
//! |------|--------|------|-------|
//! | JueJin | [`juejin`] | `div#article-root` | `h1.article-title` |

pub mod juejin;
