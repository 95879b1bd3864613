//! Statement compilers for each target dialect.
//!
//! A [`QueryCompiler`] turns a [`Query`] or [`EdgeRequest`] into one
//! complete statement text plus its bound parameters. The predicate part is
//! shared (see [`crate::compile`]); each dialect only assembles the clauses
//! around it.

mod aql;
mod cypher;
mod sql;

pub use aql::AqlDialect;
pub use cypher::CypherDialect;
pub use sql::SqlDialect;

use crate::compile::{ParamCollector, PredicateCompiler};
use crate::dialect::{DialectDescriptor, PaginationStyle};
use crate::error::RenderError;
use crate::ir::{EdgeRequest, IdentifierResolver, Predicate, Query};
use crate::value::ParamValue;
use serde_json::Value;
use std::fmt;
use tessera_config::{ConfigError, DialectConfig, DialectKind};
use tracing::debug;

/// Bound parameters, in the shape the dialect's driver expects.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    /// Placeholder order
    Positional(Vec<ParamValue>),
    /// Name to value, in first-bound order
    Named(Vec<(String, ParamValue)>),
}

impl Parameters {
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a named parameter. Always `None` for positional sets.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        match self {
            Self::Positional(_) => None,
            Self::Named(values) => values.iter().find(|(n, _)| n == name).map(|(_, v)| v),
        }
    }

    /// Values in binding order, names dropped.
    pub fn values(&self) -> Vec<&ParamValue> {
        match self {
            Self::Positional(values) => values.iter().collect(),
            Self::Named(values) => values.iter().map(|(_, v)| v).collect(),
        }
    }

    /// JSON form: an array for positional sets, an object for named ones.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Positional(values) => Value::Array(values.iter().map(ParamValue::to_json).collect()),
            Self::Named(values) => Value::Object(
                values
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

/// A compiled statement or filter fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub text: String,
    pub parameters: Parameters,
}

/// A standalone compiled predicate.
pub type CompiledFilter = CompiledStatement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Count,
    Delete,
    Edge,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Select => "SELECT",
            Self::Count => "COUNT",
            Self::Delete => "DELETE",
            Self::Edge => "EDGE",
        };
        f.write_str(name)
    }
}

/// Compiles queries to one target language.
pub trait QueryCompiler: Send + Sync {
    fn descriptor(&self) -> &DialectDescriptor;

    /// Unique name for this dialect
    fn name(&self) -> &str {
        self.descriptor().name
    }

    /// Compile a predicate on its own, with fresh parameter numbering.
    fn compile_filter(
        &self,
        predicate: &Predicate,
        resolver: &dyn IdentifierResolver,
    ) -> Result<CompiledFilter, RenderError> {
        PredicateCompiler::new(self.descriptor(), resolver).compile(predicate)
    }

    /// Translate a LIKE pattern into the form this dialect binds.
    fn translate_like(&self, pattern: Option<&str>) -> Option<String> {
        self.descriptor().translate_like(pattern)
    }

    fn select(&self, query: &Query) -> Result<CompiledStatement, RenderError>;

    fn count(&self, query: &Query) -> Result<CompiledStatement, RenderError>;

    /// Delete matching records, or null out `query.fields` on them when
    /// fields are given. Sort is ignored; a skip or limit is rejected with
    /// [`RenderError::PaginationUnsupported`].
    fn delete(&self, query: &Query) -> Result<CompiledStatement, RenderError>;

    fn edge(&self, _request: &EdgeRequest) -> Result<CompiledStatement, RenderError> {
        Err(RenderError::UnsupportedStatement {
            statement: StatementKind::Edge.to_string(),
            dialect: self.name().to_string(),
        })
    }
}

/// Build the compiler a configuration entry describes.
pub fn compiler_from_config(config: &DialectConfig) -> Result<Box<dyn QueryCompiler>, ConfigError> {
    config.validate()?;
    let compiler: Box<dyn QueryCompiler> = match config.kind {
        DialectKind::Sql => Box::new(SqlDialect::from_config(config)),
        DialectKind::Cypher => Box::new(CypherDialect::from_config(config)),
        DialectKind::Aql => Box::new(AqlDialect::from_config(config)),
    };
    debug!(dialect = compiler.name(), kind = %config.kind, "Built compiler from config");
    Ok(compiler)
}

// =========================================================================
// Clause helpers shared by the dialects
// =========================================================================

pub(crate) fn require_entity(query: &Query) -> Result<&str, RenderError> {
    let entity = query.entity.trim();
    if entity.is_empty() {
        return Err(RenderError::MissingEntity);
    }
    Ok(entity)
}

/// ` <keyword> <predicate>`, or nothing without a predicate.
pub(crate) fn filter_clause(
    dialect: &DialectDescriptor,
    query: &Query,
    keyword: &str,
    params: &mut ParamCollector,
) -> Result<String, RenderError> {
    match &query.predicate {
        Some(predicate) => {
            let text =
                PredicateCompiler::new(dialect, &query.metadata).compile_into(predicate, params)?;
            Ok(format!(" {} {}", keyword, text))
        }
        None => Ok(String::new()),
    }
}

/// ` <keyword> a ASC, b DESC`, or nothing without sort keys.
pub(crate) fn sort_clause(dialect: &DialectDescriptor, query: &Query, keyword: &str) -> String {
    if query.sort.is_empty() {
        return String::new();
    }
    let keys: Vec<String> = query
        .sort
        .iter()
        .map(|key| {
            let column = dialect.column_ref(&key.field.name, key.field.is_logical_id(&query.metadata));
            format!("{} {}", column, dialect.direction_token(key.direction))
        })
        .collect();
    format!(" {} {}", keyword, keys.join(", "))
}

/// Skip and limit in the dialect's style. Zero bounds are left out.
pub(crate) fn pagination_clause(
    dialect: &DialectDescriptor,
    skip: u64,
    limit: u64,
) -> Result<String, RenderError> {
    let unsupported = |reason: &str| RenderError::PaginationUnsupported {
        dialect: dialect.name.to_string(),
        reason: reason.to_string(),
    };

    if skip > 0 && !dialect.supports_skip {
        return Err(unsupported("skip is not supported"));
    }

    let mut out = String::new();
    match dialect.pagination {
        PaginationStyle::SkipLimit => {
            if skip > 0 {
                out.push_str(&format!(" SKIP {}", skip));
            }
            if limit > 0 {
                out.push_str(&format!(" LIMIT {}", limit));
            }
        }
        PaginationStyle::LimitOffset => {
            if limit > 0 {
                out.push_str(&format!(" LIMIT {}", limit));
            }
            if skip > 0 {
                out.push_str(&format!(" OFFSET {}", skip));
            }
        }
        PaginationStyle::OffsetCount => match (skip, limit) {
            (0, 0) => {}
            (0, limit) => out.push_str(&format!(" LIMIT {}", limit)),
            (_, 0) => return Err(unsupported("skip requires a limit")),
            (skip, limit) => out.push_str(&format!(" LIMIT {}, {}", skip, limit)),
        },
    }
    Ok(out)
}

/// Deletes act on every match; a skip or limit would be silently dropped.
pub(crate) fn reject_bounded_delete(
    dialect: &DialectDescriptor,
    query: &Query,
) -> Result<(), RenderError> {
    if query.skip > 0 || query.limit > 0 {
        return Err(RenderError::PaginationUnsupported {
            dialect: dialect.name.to_string(),
            reason: "DELETE cannot be bounded by skip or limit".to_string(),
        });
    }
    Ok(())
}

/// Fields a delete should null out; the identifier cannot be one of them.
pub(crate) fn cleared_fields(query: &Query) -> Result<Vec<&str>, RenderError> {
    query
        .fields
        .iter()
        .map(|field| {
            if query.metadata.id_field == *field {
                Err(RenderError::ImmutableIdentifier {
                    field: field.clone(),
                })
            } else {
                Ok(field.as_str())
            }
        })
        .collect()
}

pub(crate) fn finish(
    dialect: &DialectDescriptor,
    kind: StatementKind,
    text: String,
    params: ParamCollector,
) -> CompiledStatement {
    let statement = CompiledStatement {
        text,
        parameters: params.finish(),
    };
    debug!(
        dialect = dialect.name,
        kind = %kind,
        params = statement.parameters.len(),
        "Compiled statement"
    );
    statement
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::SortKey;

    struct MockCompiler(DialectDescriptor);

    impl QueryCompiler for MockCompiler {
        fn descriptor(&self) -> &DialectDescriptor {
            &self.0
        }

        fn select(&self, query: &Query) -> Result<CompiledStatement, RenderError> {
            let entity = require_entity(query)?;
            let params = ParamCollector::new(&self.0);
            Ok(finish(&self.0, StatementKind::Select, format!("SELECT 1 FROM {}", entity), params))
        }

        fn count(&self, query: &Query) -> Result<CompiledStatement, RenderError> {
            self.select(query)
        }

        fn delete(&self, query: &Query) -> Result<CompiledStatement, RenderError> {
            self.select(query)
        }
    }

    fn descriptor() -> DialectDescriptor {
        SqlDialect::default().descriptor().clone()
    }

    #[test]
    fn test_mock_compiler() {
        let compiler = MockCompiler(descriptor());
        let result = compiler.select(&Query::new("Person")).unwrap();

        assert_eq!(result.text, "SELECT 1 FROM Person");
        assert!(result.parameters.is_empty());
    }

    #[test]
    fn test_default_edge_is_unsupported() {
        let compiler = MockCompiler(descriptor());
        let request = EdgeRequest::new(
            crate::ir::EdgeEndpoint::new(1i64),
            "KNOWS",
            crate::ir::EdgeEndpoint::new(2i64),
        );

        assert!(matches!(
            compiler.edge(&request),
            Err(RenderError::UnsupportedStatement { .. })
        ));
    }

    #[test]
    fn test_missing_entity() {
        let compiler = MockCompiler(descriptor());
        assert_eq!(
            compiler.select(&Query::new("  ")).unwrap_err(),
            RenderError::MissingEntity
        );
    }

    #[test]
    fn test_pagination_styles() {
        let mut d = descriptor();

        d.pagination = PaginationStyle::SkipLimit;
        assert_eq!(pagination_clause(&d, 5, 10).unwrap(), " SKIP 5 LIMIT 10");
        assert_eq!(pagination_clause(&d, 10, 0).unwrap(), " SKIP 10");
        assert_eq!(pagination_clause(&d, 0, 7).unwrap(), " LIMIT 7");
        assert_eq!(pagination_clause(&d, 0, 0).unwrap(), "");

        d.pagination = PaginationStyle::LimitOffset;
        assert_eq!(pagination_clause(&d, 5, 10).unwrap(), " LIMIT 10 OFFSET 5");
        assert_eq!(pagination_clause(&d, 5, 0).unwrap(), " OFFSET 5");

        d.pagination = PaginationStyle::OffsetCount;
        assert_eq!(pagination_clause(&d, 5, 10).unwrap(), " LIMIT 5, 10");
        assert_eq!(pagination_clause(&d, 0, 10).unwrap(), " LIMIT 10");
        assert!(matches!(
            pagination_clause(&d, 5, 0),
            Err(RenderError::PaginationUnsupported { .. })
        ));
    }

    #[test]
    fn test_skip_unsupported() {
        let d = DialectDescriptor {
            supports_skip: false,
            ..descriptor()
        };

        assert_eq!(pagination_clause(&d, 0, 10).unwrap(), " LIMIT 10");
        assert!(matches!(
            pagination_clause(&d, 3, 10),
            Err(RenderError::PaginationUnsupported { .. })
        ));
    }

    #[test]
    fn test_bounded_delete_rejected() {
        let d = descriptor();

        assert!(reject_bounded_delete(&d, &Query::new("Person")).is_ok());
        for query in [
            Query::new("Person").limit(5),
            Query::new("Person").skip(2),
            Query::new("Person").limit(5).skip(2),
        ] {
            assert!(matches!(
                reject_bounded_delete(&d, &query),
                Err(RenderError::PaginationUnsupported { .. })
            ));
        }
    }

    #[test]
    fn test_sort_clause_uses_id_accessor() {
        let d = descriptor();
        let query = Query::new("Person")
            .sort_by(SortKey::desc("id"))
            .sort_by(SortKey::asc("name"));

        assert_eq!(sort_clause(&d, &query, "ORDER BY"), " ORDER BY @rid DESC, name ASC");
    }

    #[test]
    fn test_cleared_fields_rejects_identifier() {
        let query = Query::new("Person").fields(["email", "id"]);
        assert_eq!(
            cleared_fields(&query).unwrap_err(),
            RenderError::ImmutableIdentifier {
                field: "id".to_string()
            }
        );
    }

    #[test]
    fn test_parameters_json() {
        let named = Parameters::Named(vec![("filter_0".to_string(), ParamValue::Int(1))]);
        assert_eq!(named.to_json(), serde_json::json!({ "filter_0": 1 }));

        let positional = Parameters::Positional(vec![ParamValue::Null, "x".into()]);
        assert_eq!(positional.to_json(), serde_json::json!([null, "x"]));
        assert_eq!(positional.get("x"), None);
    }

    #[test]
    fn test_compiler_from_config() {
        let config = DialectConfig::new(DialectKind::Aql);
        let compiler = compiler_from_config(&config).unwrap();
        assert_eq!(compiler.name(), "aql");
    }
}
