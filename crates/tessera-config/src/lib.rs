//! # Tessera Configuration
//!
//! Serde-deserializable descriptions of the query dialects the translator
//! targets. A configuration names a dialect family and optionally overrides
//! its parameter style, record alias, identifier accessor, LIKE handling and
//! pagination clause.
//!
//! ## Quick Start
//!
//! ```rust
//! use tessera_config::{DialectKind, TranslatorConfig};
//!
//! let config = TranslatorConfig::from_toml_str(
//!     r#"
//!     [dialects.graph]
//!     kind = "cypher"
//!     id_accessor = "elementId({alias})"
//!     "#,
//! )
//! .unwrap();
//!
//! let graph = config.dialect("graph").unwrap();
//! assert_eq!(graph.kind, DialectKind::Cypher);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod dialect;
mod error;
mod loader;

pub use dialect::*;
pub use error::{ConfigError, ConfigResult};
pub use loader::*;
