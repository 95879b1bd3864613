//! Cypher renderer.
//!
//! `MATCH (n:Label) WHERE ... RETURN n` with `$name` parameters, `id(n)`
//! as the record identifier and LIKE translated to a `=~` regex.

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

const SOURCE_ALIAS: &str = "a";
const TARGET_ALIAS: &str = "b";

pub struct CypherDialect {
    descriptor: DialectDescriptor,
}

impl Default for CypherDialect {
    fn default() -> Self {
        Self {
            descriptor: DialectDescriptor {
                name: "cypher",
                param_style: ParamStyle::Named { sigil: '$' },
                record_alias: Some("n".to_string()),
                id_accessor: "id({alias})".to_string(),
                logical_id_param: "id".to_string(),
                operators: OperatorTable {
                    like: None,
                    between: Some("{param}[0] <= {field} <= {param}[1]"),
                    regex_match: Some("{field} =~ {param}"),
                    starts_with: Some("{field} STARTS WITH {param}"),
                    ends_with: Some("{field} ENDS WITH {param}"),
                    contains: Some("{field} CONTAINS {param}"),
                    ..OperatorTable::infix()
                },
                and_token: "AND",
                or_token: "OR",
                not_token: "NOT",
                asc_token: "ASC",
                desc_token: "DESC",
                null_literal: "null",
                like: LikeStrategy::Regex,
                regex_quoting: RegexQuoting::Block,
                pagination: PaginationStyle::SkipLimit,
                supports_skip: true,
            },
        }
    }
}

impl CypherDialect {
    pub fn from_config(config: &DialectConfig) -> Self {
        Self {
            descriptor: Self::default().descriptor.with_overrides(config),
        }
    }

    fn alias(&self) -> &str {
        self.descriptor.record_alias.as_deref().unwrap_or("n")
    }

    fn match_clause(&self, entity: &str) -> String {
        format!("MATCH ({}:{})", self.alias(), entity)
    }

    fn projection(&self, query: &Query) -> String {
        if query.fields.is_empty() {
            return self.alias().to_string();
        }
        query
            .fields
            .iter()
            .map(|field| {
                let source = if query.metadata.id_field == *field {
                    self.descriptor.id_ref()
                } else {
                    self.descriptor.field_ref(field)
                };
                format!("{} AS {}", source, field)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn endpoint_pattern(alias: &str, endpoint: &EdgeEndpoint) -> String {
        match &endpoint.entity {
            Some(entity) => format!("({}:{})", alias, entity),
            None => format!("({})", alias),
        }
    }
}

impl QueryCompiler for CypherDialect {
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
            "{}{} RETURN {}{}{}",
            self.match_clause(entity),
            filter,
            self.projection(query),
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
        let text = format!(
            "{}{} RETURN count({})",
            self.match_clause(entity),
            filter,
            self.alias()
        );
        Ok(finish(d, StatementKind::Count, text, params))
    }

    fn delete(&self, query: &Query) -> Result<CompiledStatement, RenderError> {
        let d = &self.descriptor;
        let entity = require_entity(query)?;
        reject_bounded_delete(d, query)?;
        let cleared = cleared_fields(query)?;
        let mut params = ParamCollector::new(d);

        let filter = filter_clause(d, query, "WHERE", &mut params)?;
        let action = if cleared.is_empty() {
            format!("DETACH DELETE {}", self.alias())
        } else {
            let assignments: Vec<String> = cleared
                .iter()
                .map(|field| format!("{} = {}", d.field_ref(field), d.null_literal))
                .collect();
            format!("SET {}", assignments.join(", "))
        };
        let text = format!("{}{} {}", self.match_clause(entity), filter, action);
        Ok(finish(d, StatementKind::Delete, text, params))
    }

    fn edge(&self, request: &EdgeRequest) -> Result<CompiledStatement, RenderError> {
        let d = &self.descriptor;
        let mut params = ParamCollector::new(d);
        let from = params.bind("from", coerce(&request.source.id)?);
        let to = params.bind("to", coerce(&request.target.id)?);

        let mut properties = Vec::with_capacity(request.properties.len());
        for (i, (key, value)) in request.properties.iter().enumerate() {
            let placeholder = params.bind(format!("prop_{}", i), coerce(value)?);
            properties.push(format!("{}: {}", key, placeholder));
        }
        let property_map = if properties.is_empty() {
            String::new()
        } else {
            format!(" {{{}}}", properties.join(", "))
        };

        let verb = match request.mode {
            EdgeMode::Create => "CREATE",
            EdgeMode::Merge => "MERGE",
        };

        let text = format!(
            "MATCH {}, {} WHERE {} = {} AND {} = {} {} ({})-[r:{}{}]->({}) RETURN r",
            Self::endpoint_pattern(SOURCE_ALIAS, &request.source),
            Self::endpoint_pattern(TARGET_ALIAS, &request.target),
            d.id_ref_for(SOURCE_ALIAS),
            from,
            d.id_ref_for(TARGET_ALIAS),
            to,
            verb,
            SOURCE_ALIAS,
            request.label,
            property_map,
            TARGET_ALIAS
        );
        Ok(finish(d, StatementKind::Edge, text, params))
    }
}
