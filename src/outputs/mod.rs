//! Output side of the pipeline: markdown conversion and the vault.
//!
//! # Submodules
//!
//! - [`markdown`]: Converts the content subtree to CommonMark with GitHub extensions
//! - [`persist`]: Writes the finished note into the destination folder
//! - [`vault`]: The [`Storage`](vault::Storage) collaborator and its filesystem implementation
//!
//! # Output Structure
//!
//! ```text
//! vault/
//! ├── .juejin_markdown.json     # Saved settings
//! ├── assets/                   # Localized images
//! │   ├── 0b6f7c1e-....png
//! │   └── 5d2a90f4-....jpg
//! └── notes/juejin/
//!     └── Rust Async a tour.md  # One note per article
//! ```

pub mod markdown;
pub mod persist;
pub mod vault;
