//! SQL renderer.
//!
//! Renders to the OrientDB SQL flavour by default: positional `?`
//! placeholders, `@rid` as the record identifier, native LIKE and
//! `SKIP n LIMIT m` pagination. [`SqlDialect::ansi`] gives the plain
//! relational variant with `LIMIT m OFFSET n` and no edge statements.

use crate::compile::ParamCollector;
use crate::dialect::{DialectDescriptor, LikeStrategy, OperatorTable, PaginationStyle, ParamStyle};
use crate::error::RenderError;
use crate::ir::{EdgeMode, EdgeRequest, Query};
use crate::pattern::RegexQuoting;
use crate::render::{
    cleared_fields, filter_clause, finish, pagination_clause, reject_bounded_delete,
    require_entity, sort_clause, CompiledStatement, QueryCompiler, StatementKind,
};
use crate::value::coerce;
use tessera_config::DialectConfig;

pub struct SqlDialect {
    descriptor: DialectDescriptor,
    /// Whether `CREATE EDGE` is available
    edges: bool,
}

impl Default for SqlDialect {
    fn default() -> Self {
        Self::orientdb()
    }
}

impl SqlDialect {
    pub fn orientdb() -> Self {
        Self {
            descriptor: DialectDescriptor {
                name: "sql",
                param_style: ParamStyle::Positional,
                record_alias: None,
                id_accessor: "@rid".to_string(),
                logical_id_param: "id".to_string(),
                operators: OperatorTable::infix(),
                and_token: "AND",
                or_token: "OR",
                not_token: "NOT",
                asc_token: "ASC",
                desc_token: "DESC",
                null_literal: "NULL",
                like: LikeStrategy::Native,
                regex_quoting: RegexQuoting::Escape,
                pagination: PaginationStyle::SkipLimit,
                supports_skip: true,
            },
            edges: true,
        }
    }

    /// Relational SQL: `id` column, `LIMIT m OFFSET n`, `BETWEEN`, no edges.
    pub fn ansi() -> Self {
        let mut dialect = Self::orientdb();
        dialect.descriptor.id_accessor = "id".to_string();
        dialect.descriptor.pagination = PaginationStyle::LimitOffset;
        dialect.descriptor.operators.between = Some("{field} BETWEEN {param}");
        dialect.edges = false;
        dialect
    }

    pub fn from_config(config: &DialectConfig) -> Self {
        let base = Self::orientdb();
        Self {
            descriptor: base.descriptor.with_overrides(config),
            edges: base.edges,
        }
    }

    /// Use a hand-built descriptor, e.g. to turn off skip support.
    pub fn with_descriptor(descriptor: DialectDescriptor) -> Self {
        Self {
            descriptor,
            edges: true,
        }
    }

    fn projection(&self, query: &Query) -> String {
        if query.fields.is_empty() {
            return "*".to_string();
        }
        query
            .fields
            .iter()
            .map(|field| {
                if query.metadata.id_field == *field {
                    format!("{} AS {}", self.descriptor.id_ref(), field)
                } else {
                    self.descriptor.field_ref(field)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl QueryCompiler for SqlDialect {
    fn descriptor(&self) -> &DialectDescriptor {
        &self.descriptor
    }

    fn select(&self, query: &Query) -> Result<CompiledStatement, RenderError> {
        let d = &self.descriptor;
        let entity = require_entity(query)?;
        let mut params = ParamCollector::new(d);

        let filter = filter_clause(d, query, "WHERE", &mut params)?;
        let order = sort_clause(d, query, "ORDER BY");
        let page = pagination_clause(d, query.skip, query.limit)?;

        let text = format!(
            "SELECT {} FROM {}{}{}{}",
            self.projection(query),
            entity,
            filter,
            order,
            page
        );
        Ok(finish(d, StatementKind::Select, text, params))
    }

    fn count(&self, query: &Query) -> Result<CompiledStatement, RenderError> {
        let d = &self.descriptor;
        let entity = require_entity(query)?;
        let mut params = ParamCollector::new(d);

        let filter = filter_clause(d, query, "WHERE", &mut params)?;
        let text = format!("SELECT count(*) FROM {}{}", entity, filter);
        Ok(finish(d, StatementKind::Count, text, params))
    }

    fn delete(&self, query: &Query) -> Result<CompiledStatement, RenderError> {
        let d = &self.descriptor;
        let entity = require_entity(query)?;
        reject_bounded_delete(d, query)?;
        let cleared = cleared_fields(query)?;
        let mut params = ParamCollector::new(d);

        let filter = filter_clause(d, query, "WHERE", &mut params)?;
        let text = if cleared.is_empty() {
            format!("DELETE FROM {}{}", entity, filter)
        } else {
            let assignments: Vec<String> = cleared
                .iter()
                .map(|field| format!("{} = {}", d.field_ref(field), d.null_literal))
                .collect();
            format!("UPDATE {} SET {}{}", entity, assignments.join(", "), filter)
        };
        Ok(finish(d, StatementKind::Delete, text, params))
    }

    fn edge(&self, request: &EdgeRequest) -> Result<CompiledStatement, RenderError> {
        let d = &self.descriptor;
        let unsupported = |statement: &str| RenderError::UnsupportedStatement {
            statement: statement.to_string(),
            dialect: d.name.to_string(),
        };
        if !self.edges {
            return Err(unsupported("EDGE"));
        }
        if request.mode == EdgeMode::Merge {
            return Err(unsupported("EDGE MERGE"));
        }

        let mut params = ParamCollector::new(d);
        let from = params.bind("from", coerce(&request.source.id)?);
        let to = params.bind("to", coerce(&request.target.id)?);

        let mut text = format!("CREATE EDGE {} FROM {} TO {}", request.label, from, to);
        if !request.properties.is_empty() {
            let mut assignments = Vec::with_capacity(request.properties.len());
            for (i, (key, value)) in request.properties.iter().enumerate() {
                let placeholder = params.bind(format!("prop_{}", i), coerce(value)?);
                assignments.push(format!("{} = {}", key, placeholder));
            }
            text.push_str(&format!(" SET {}", assignments.join(", ")));
        }
        Ok(finish(d, StatementKind::Edge, text, params))
    }
}
