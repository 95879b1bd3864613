//! Dialect descriptors.
//!
//! A [`DialectDescriptor`] is pure data: the tokens, operator templates,
//! parameter style and capabilities of one target language. The predicate
//! compiler and the statement assemblers read it; none of them hard-code a
//! dialect's syntax.

use crate::ir::{Direction, Junction, Op};
use crate::pattern::{self, PatternTarget, RegexQuoting};

pub use tessera_config::{LikeStrategy, PaginationStyle, ParamStyle};

/// Comparison templates with `{field}` and `{param}` slots.
///
/// `None` means the dialect cannot express the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorTable {
    pub eq: Option<&'static str>,
    pub gt: Option<&'static str>,
    pub gte: Option<&'static str>,
    pub lt: Option<&'static str>,
    pub lte: Option<&'static str>,
    pub like: Option<&'static str>,
    pub is_in: Option<&'static str>,
    pub between: Option<&'static str>,
    /// Full regex match, used when LIKE is translated to a regex
    pub regex_match: Option<&'static str>,
    pub starts_with: Option<&'static str>,
    pub ends_with: Option<&'static str>,
    pub contains: Option<&'static str>,
}

impl OperatorTable {
    /// Infix comparisons shared by SQL-like dialects.
    pub const fn infix() -> Self {
        Self {
            eq: Some("{field} = {param}"),
            gt: Some("{field} > {param}"),
            gte: Some("{field} >= {param}"),
            lt: Some("{field} < {param}"),
            lte: Some("{field} <= {param}"),
            like: Some("{field} LIKE {param}"),
            is_in: Some("{field} IN {param}"),
            between: None,
            regex_match: None,
            starts_with: None,
            ends_with: None,
            contains: None,
        }
    }

    pub fn template(&self, op: Op) -> Option<&'static str> {
        match op {
            Op::Eq => self.eq,
            Op::Gt => self.gt,
            Op::Gte => self.gte,
            Op::Lt => self.lt,
            Op::Lte => self.lte,
            Op::Like => self.like,
            Op::In => self.is_in,
            Op::Between => self.between,
        }
    }
}

/// Fill a comparison template in one pass, so a field name can never be
/// mistaken for a slot.
pub fn fill_template(template: &str, field: &str, param: &str) -> String {
    let mut out = String::with_capacity(template.len() + field.len() + param.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{field}") {
            out.push_str(field);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{param}") {
            out.push_str(param);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Everything the compiler needs to know about a target language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectDescriptor {
    pub name: &'static str,
    pub param_style: ParamStyle,
    /// Record variable (`n`, `d`); `None` for bare column references.
    pub record_alias: Option<String>,
    /// Native identifier accessor, `{alias}` replaced by the record alias.
    pub id_accessor: String,
    /// Reserved parameter name for logical identifier operands.
    pub logical_id_param: String,
    pub operators: OperatorTable,
    pub and_token: &'static str,
    pub or_token: &'static str,
    pub not_token: &'static str,
    pub asc_token: &'static str,
    pub desc_token: &'static str,
    pub null_literal: &'static str,
    pub like: LikeStrategy,
    pub regex_quoting: RegexQuoting,
    pub pagination: PaginationStyle,
    pub supports_skip: bool,
}

impl DialectDescriptor {
    pub fn junction_token(&self, junction: Junction) -> &'static str {
        match junction {
            Junction::And => self.and_token,
            Junction::Or => self.or_token,
        }
    }

    pub fn direction_token(&self, direction: Direction) -> &'static str {
        match direction {
            Direction::Asc => self.asc_token,
            Direction::Desc => self.desc_token,
        }
    }

    /// Native identifier accessor for the default record alias.
    pub fn id_ref(&self) -> String {
        self.id_ref_for(self.record_alias.as_deref().unwrap_or_default())
    }

    /// Native identifier accessor for an explicit alias (edge endpoints).
    pub fn id_ref_for(&self, alias: &str) -> String {
        self.id_accessor.replace("{alias}", alias)
    }

    /// Plain, unquoted field reference.
    pub fn field_ref(&self, field: &str) -> String {
        match &self.record_alias {
            Some(alias) => format!("{}.{}", alias, field),
            None => field.to_string(),
        }
    }

    /// Field reference, or the accessor when the field is the identifier.
    pub fn column_ref(&self, field: &str, is_logical_id: bool) -> String {
        if is_logical_id {
            self.id_ref()
        } else {
            self.field_ref(field)
        }
    }

    /// Translate a LIKE pattern the way this dialect binds it.
    pub fn translate_like(&self, pattern: Option<&str>) -> Option<String> {
        let target = match self.like {
            LikeStrategy::Native => PatternTarget::Like,
            LikeStrategy::Regex | LikeStrategy::Substring => PatternTarget::Regex {
                quoting: self.regex_quoting,
                anchored: true,
            },
        };
        pattern::translate(pattern, target)
    }

    /// Apply configured overrides on top of a built-in descriptor.
    pub fn with_overrides(mut self, config: &tessera_config::DialectConfig) -> Self {
        if let Some(alias) = &config.record_alias {
            self.record_alias = Some(alias.clone());
        }
        if let Some(accessor) = &config.id_accessor {
            self.id_accessor = accessor.clone();
        }
        self.logical_id_param = config.logical_id_param.clone();
        if let Some(style) = config.param_style {
            self.param_style = style;
        }
        if let Some(like) = config.like {
            self.like = like;
        }
        if let Some(pagination) = config.pagination {
            self.pagination = pagination;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_config::{DialectConfig, DialectKind};

    fn descriptor() -> DialectDescriptor {
        DialectDescriptor {
            name: "test",
            param_style: ParamStyle::Named { sigil: '$' },
            record_alias: Some("n".to_string()),
            id_accessor: "id({alias})".to_string(),
            logical_id_param: "id".to_string(),
            operators: OperatorTable::infix(),
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
        }
    }

    #[test]
    fn test_fill_template_single_pass() {
        assert_eq!(
            fill_template("{field} = {param}", "n.{param}", "$p"),
            "n.{param} = $p"
        );
        assert_eq!(
            fill_template("{param}[0] <= {field}", "n.age", "$p"),
            "$p[0] <= n.age"
        );
        assert_eq!(fill_template("{ x }", "f", "p"), "{ x }");
    }

    #[test]
    fn test_column_ref() {
        let d = descriptor();
        assert_eq!(d.column_ref("name", false), "n.name");
        assert_eq!(d.column_ref("id", true), "id(n)");
        assert_eq!(d.id_ref_for("a"), "id(a)");
    }

    #[test]
    fn test_field_ref_without_alias() {
        let d = DialectDescriptor {
            record_alias: None,
            ..descriptor()
        };
        assert_eq!(d.field_ref("name"), "name");
    }

    #[test]
    fn test_translate_like_regex() {
        let d = descriptor();
        assert_eq!(d.translate_like(Some("a%")), Some(r"^\Qa\E.*$".to_string()));
    }

    #[test]
    fn test_translate_like_native() {
        let d = DialectDescriptor {
            like: LikeStrategy::Native,
            ..descriptor()
        };
        assert_eq!(d.translate_like(Some("a%")), Some("a%".to_string()));
        assert_eq!(d.translate_like(None), None);
    }

    #[test]
    fn test_overrides() {
        let mut config = DialectConfig::new(DialectKind::Cypher);
        config.record_alias = Some("node".to_string());
        config.id_accessor = Some("elementId({alias})".to_string());
        config.pagination = Some(PaginationStyle::LimitOffset);

        let d = descriptor().with_overrides(&config);

        assert_eq!(d.id_ref(), "elementId(node)");
        assert_eq!(d.field_ref("x"), "node.x");
        assert_eq!(d.pagination, PaginationStyle::LimitOffset);
        assert_eq!(d.like, LikeStrategy::Regex);
    }
}
