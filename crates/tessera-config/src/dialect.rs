//! Dialect configuration
//!
//! Every field except `kind` is an override: `None` keeps the built-in
//! default of the chosen dialect family.

use crate::error::{ConfigError, ConfigResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"));

/// Parameter names the compiler generates for filters and edges
static GENERATED_PARAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:filter|prop)_[0-9]+|from|to)$").expect("generated parameter regex is valid")
});

/// Sigils accepted for named and numbered parameter styles
pub const PARAM_SIGILS: [char; 3] = [':', '$', '@'];

/// Dialect family to compile for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    /// SQL-like statements (OrientDB SQL flavour by default)
    Sql,
    /// Neo4j Cypher
    Cypher,
    /// ArangoDB AQL
    Aql,
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql => write!(f, "sql"),
            Self::Cypher => write!(f, "cypher"),
            Self::Aql => write!(f, "aql"),
        }
    }
}

/// How bound parameters are referenced in query text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum ParamStyle {
    /// `?` placeholders, values bound by position
    Positional,
    /// `$1`, `$2`, ... placeholders, values bound by position
    Numbered {
        /// Leading sigil
        sigil: char,
    },
    /// `:name`, `$name` or `@name` placeholders, values bound by name
    Named {
        /// Leading sigil
        sigil: char,
    },
}

impl ParamStyle {
    /// Whether parameters are collected as a name → value list
    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named { .. })
    }
}

/// How LIKE comparisons are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeStrategy {
    /// The dialect understands `%` and `_` natively
    Native,
    /// Translate the pattern to an anchored regular expression
    Regex,
    /// Use STARTS WITH / ENDS WITH / CONTAINS where the pattern allows,
    /// regex otherwise
    Substring,
}

/// Pagination clause layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStyle {
    /// `SKIP n LIMIT m`
    SkipLimit,
    /// `LIMIT m OFFSET n`
    LimitOffset,
    /// `LIMIT n, m`; a skip always needs a count
    OffsetCount,
}

fn default_logical_id_param() -> String {
    "id".to_string()
}

/// Configuration for one target dialect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectConfig {
    /// Dialect family
    pub kind: DialectKind,

    /// Variable naming the current record (`n`, `d`)
    #[serde(default)]
    pub record_alias: Option<String>,

    /// Template for the native identifier accessor, `{alias}` is replaced
    /// by the record alias (`id({alias})`, `{alias}._key`, `@rid`)
    #[serde(default)]
    pub id_accessor: Option<String>,

    /// Reserved parameter name for logical identifier comparisons
    #[serde(default = "default_logical_id_param")]
    pub logical_id_param: String,

    /// Parameter placeholder style
    #[serde(default)]
    pub param_style: Option<ParamStyle>,

    /// LIKE handling
    #[serde(default)]
    pub like: Option<LikeStrategy>,

    /// Pagination clause layout
    #[serde(default)]
    pub pagination: Option<PaginationStyle>,
}

impl DialectConfig {
    /// Configuration with all defaults for `kind`
    pub fn new(kind: DialectKind) -> Self {
        Self {
            kind,
            record_alias: None,
            id_accessor: None,
            logical_id_param: default_logical_id_param(),
            param_style: None,
            like: None,
            pagination: None,
        }
    }

    /// Check that overrides are usable before a compiler is built from them
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(alias) = &self.record_alias {
            if !IDENT_RE.is_match(alias) {
                return Err(ConfigError::invalid(
                    "record_alias",
                    format!("'{}' is not an identifier", alias),
                ));
            }
        }

        if !IDENT_RE.is_match(&self.logical_id_param) {
            return Err(ConfigError::invalid(
                "logical_id_param",
                format!("'{}' is not an identifier", self.logical_id_param),
            ));
        }
        if GENERATED_PARAM_RE.is_match(&self.logical_id_param) {
            return Err(ConfigError::invalid(
                "logical_id_param",
                format!(
                    "'{}' clashes with a generated parameter name",
                    self.logical_id_param
                ),
            ));
        }

        if let Some(accessor) = &self.id_accessor {
            if accessor.trim().is_empty() {
                return Err(ConfigError::invalid("id_accessor", "must not be empty"));
            }
            // Graph and document dialects address fields through the alias
            if self.kind != DialectKind::Sql && !accessor.contains("{alias}") {
                return Err(ConfigError::invalid(
                    "id_accessor",
                    format!("'{}' must reference {{alias}} for {}", accessor, self.kind),
                ));
            }
        }

        match self.param_style {
            Some(ParamStyle::Named { sigil }) | Some(ParamStyle::Numbered { sigil })
                if !PARAM_SIGILS.contains(&sigil) =>
            {
                Err(ConfigError::invalid(
                    "param_style",
                    format!("unsupported sigil '{}'", sigil),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Top-level configuration: named dialects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Dialects keyed by a caller-chosen name
    #[serde(default)]
    pub dialects: BTreeMap<String, DialectConfig>,
}

impl TranslatorConfig {
    /// Look up a configured dialect
    pub fn dialect(&self, name: &str) -> ConfigResult<&DialectConfig> {
        self.dialects
            .get(name)
            .ok_or_else(|| ConfigError::UnknownDialect(name.to_string()))
    }

    /// Validate every configured dialect
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, dialect) in &self.dialects {
            dialect.validate().map_err(|e| match e {
                ConfigError::Invalid { field, message } => ConfigError::Invalid {
                    field: format!("dialects.{}.{}", name, field),
                    message,
                },
                other => other,
            })?;
        }
        Ok(())
    }
}
