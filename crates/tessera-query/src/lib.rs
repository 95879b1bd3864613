//! # Tessera Query
//!
//! Translates a dialect-agnostic predicate tree into statement text for
//! OrientDB-style SQL, Cypher and AQL, with every operand bound as a
//! parameter.
//!
//! ## Pipeline
//!
//! ```text
//! Query ──► PredicateCompiler ──► QueryCompiler (per dialect) ──► CompiledStatement
//!                 │                                                     │
//!            coerce values                                     StatementExecutor
//! ```
//!
//! ## Example
//!
//! ```rust
//! use tessera_query::{Predicate, Query, QueryCompiler, SqlDialect};
//!
//! let query = Query::new("Person")
//!     .filter(Predicate::eq("name", "value").and(Predicate::lte("age", 10i32)));
//!
//! let statement = SqlDialect::default().select(&query).unwrap();
//! assert_eq!(statement.text, "SELECT * FROM Person WHERE name = ? AND age <= ?");
//! ```

#![warn(clippy::all)]

pub mod compile;
pub mod dialect;
pub mod error;
pub mod execute;
pub mod ir;
pub mod pattern;
pub mod render;
pub mod value;

pub use compile::{ParamCollector, PredicateCompiler};
pub use dialect::{DialectDescriptor, OperatorTable};
pub use error::{CoerceError, ExecuteError, PipelineError, RenderError};
pub use execute::{QueryPipeline, Record, RecordStream, StatementExecutor};
pub use ir::{
    Direction, EdgeEndpoint, EdgeMode, EdgeRequest, EntityMetadata, Identifier, IdentifierResolver,
    Junction, Op, Predicate, Query, SortKey,
};
pub use pattern::{translate as translate_pattern, PatternTarget, RegexQuoting, WildcardPattern};
pub use render::{
    compiler_from_config, AqlDialect, CompiledFilter, CompiledStatement, CypherDialect,
    Parameters, QueryCompiler, SqlDialect, StatementKind,
};
pub use value::{coerce, ParamValue, RuntimeValue};
