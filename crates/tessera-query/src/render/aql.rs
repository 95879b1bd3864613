//! AQL renderer (ArangoDB).
//!
//! `FOR d IN Collection FILTER ... RETURN d` with `@name` bind parameters
//! and `d._key` as the record identifier. Pagination uses
//! `LIMIT offset, count`, so a skip without a limit cannot be expressed.

use crate::compile::ParamCollector;
use crate::dialect::{DialectDescriptor, LikeStrategy, OperatorTable, PaginationStyle, ParamStyle};
use crate::error::RenderError;
use crate::ir::{EdgeEndpoint, EdgeMode, EdgeRequest, Query};
use crate::pattern::RegexQuoting;
use crate::render::{
    cleared_fields, filter_clause, finish, pagination_clause, reject_bounded_delete,
    require_entity, sort_clause, CompiledStatement, QueryCompiler, StatementKind,
};
use crate::value::coerce;
use tessera_config::DialectConfig;

pub struct AqlDialect {
    descriptor: DialectDescriptor,
}

impl Default for AqlDialect {
    fn default() -> Self {
        Self {
            descriptor: DialectDescriptor {
                name: "aql",
                param_style: ParamStyle::Named { sigil: '@' },
                record_alias: Some("d".to_string()),
                id_accessor: "{alias}._key".to_string(),
                logical_id_param: "id".to_string(),
                operators: OperatorTable {
                    eq: Some("{field} == {param}"),
                    between: Some("({field} >= {param}[0] AND {field} <= {param}[1])"),
                    regex_match: Some("{field} =~ {param}"),
                    starts_with: Some("STARTS_WITH({field}, {param})"),
                    contains: Some("CONTAINS({field}, {param})"),
                    ..OperatorTable::infix()
                },
                and_token: "AND",
                or_token: "OR",
                not_token: "NOT",
                asc_token: "ASC",
                desc_token: "DESC",
                null_literal: "null",
                like: LikeStrategy::Native,
                regex_quoting: RegexQuoting::Escape,
                pagination: PaginationStyle::OffsetCount,
                supports_skip: true,
            },
        }
    }
}

impl AqlDialect {
    pub fn from_config(config: &DialectConfig) -> Self {
        Self {
            descriptor: Self::default().descriptor.with_overrides(config),
        }
    }

    fn alias(&self) -> &str {
        self.descriptor.record_alias.as_deref().unwrap_or("d")
    }

    fn for_clause(&self, entity: &str) -> String {
        format!("FOR {} IN {}", self.alias(), entity)
    }

    fn projection(&self, query: &Query) -> String {
        if query.fields.is_empty() {
            return self.alias().to_string();
        }
        let entries: Vec<String> = query
            .fields
            .iter()
            .map(|field| {
                let source = if query.metadata.id_field == *field {
                    self.descriptor.id_ref()
                } else {
                    self.descriptor.field_ref(field)
                };
                format!("{}: {}", field, source)
            })
            .collect();
        format!("{{ {} }}", entries.join(", "))
    }

    /// Document handle for an endpoint: the bare key, or `Entity/key` when
    /// the collection is known.
    fn endpoint_ref(endpoint: &EdgeEndpoint, placeholder: &str) -> String {
        match &endpoint.entity {
            Some(entity) => format!("CONCAT(\"{}/\", {})", entity, placeholder),
            None => placeholder.to_string(),
        }
    }
}

impl QueryCompiler for AqlDialect {
    fn descriptor(&self) -> &DialectDescriptor {
        &self.descriptor
    }

    fn select(&self, query: &Query) -> Result<CompiledStatement, RenderError> {
        let d = &self.descriptor;
        let entity = require_entity(query)?;
        let mut params = ParamCollector::new(d);

        let filter = filter_clause(d, query, "FILTER", &mut params)?;
        let sort = sort_clause(d, query, "SORT");
        let page = pagination_clause(d, query.skip, query.limit)?;

        let text = format!(
            "{}{}{}{} RETURN {}",
            self.for_clause(entity),
            filter,
            sort,
            page,
            self.projection(query)
        );
        Ok(finish(d, StatementKind::Select, text, params))
    }

    fn count(&self, query: &Query) -> Result<CompiledStatement, RenderError> {
        let d = &self.descriptor;
        let entity = require_entity(query)?;
        let mut params = ParamCollector::new(d);

        let filter = filter_clause(d, query, "FILTER", &mut params)?;
        let text = format!(
            "{}{} COLLECT WITH COUNT INTO length RETURN length",
            self.for_clause(entity),
            filter
        );
        Ok(finish(d, StatementKind::Count, text, params))
    }

    fn delete(&self, query: &Query) -> Result<CompiledStatement, RenderError> {
        let d = &self.descriptor;
        let entity = require_entity(query)?;
        reject_bounded_delete(d, query)?;
        let cleared = cleared_fields(query)?;
        let mut params = ParamCollector::new(d);

        let filter = filter_clause(d, query, "FILTER", &mut params)?;
        let action = if cleared.is_empty() {
            format!("REMOVE {} IN {}", self.alias(), entity)
        } else {
            let entries: Vec<String> = cleared
                .iter()
                .map(|field| format!("{}: {}", field, d.null_literal))
                .collect();
            format!(
                "UPDATE {} WITH {{ {} }} IN {} OPTIONS {{ keepNull: true }}",
                self.alias(),
                entries.join(", "),
                entity
            )
        };
        let text = format!("{}{} {}", self.for_clause(entity), filter, action);
        Ok(finish(d, StatementKind::Delete, text, params))
    }

    fn edge(&self, request: &EdgeRequest) -> Result<CompiledStatement, RenderError> {
        let d = &self.descriptor;
        let mut params = ParamCollector::new(d);
        let from = params.bind("from", coerce(&request.source.id)?);
        let to = params.bind("to", coerce(&request.target.id)?);

        let endpoints = format!(
            "_from: {}, _to: {}",
            Self::endpoint_ref(&request.source, &from),
            Self::endpoint_ref(&request.target, &to)
        );
        let mut document = vec![endpoints.clone()];
        for (i, (key, value)) in request.properties.iter().enumerate() {
            let placeholder = params.bind(format!("prop_{}", i), coerce(value)?);
            document.push(format!("{}: {}", key, placeholder));
        }
        let document = format!("{{ {} }}", document.join(", "));

        let text = match request.mode {
            EdgeMode::Create => format!("INSERT {} INTO {} RETURN NEW", document, request.label),
            EdgeMode::Merge => format!(
                "UPSERT {{ {} }} INSERT {} UPDATE {{}} IN {} RETURN NEW",
                endpoints, document, request.label
            ),
        };
        Ok(finish(d, StatementKind::Edge, text, params))
    }
}
