//! clifun-core: parsing, walking and transform utilities behind the clifun tools
//!
//! This crate keeps a small surface that every tool shares:
//! - Depth-first walking of nested JSON values (`walk`)
//! - Flatten/unflatten and key pruning over nested mappings (`dict`)
//! - JSON inspection and Python-style formatting (`json`)
//! - A small XML element tree with path queries and XML→JSON conversion (`xml`)
//! - Robot Framework output and Gherkin feature helpers (`rfxml`, `gherkin`)
//! - Plain text metrics and word search (`txt`), template rendering (`template`)
//!
pub mod dict;
pub mod error;
pub mod gherkin;
pub mod input;
pub mod json;
pub mod pattern;
pub mod rfxml;
pub mod template;
pub mod txt;
pub mod walk;
pub mod xml;

pub use error::{Error, Result};
pub use input::Input;
pub use walk::{PathKey, WalkItem, WalkOptions, objwalk, to_pointer, walk_items};
