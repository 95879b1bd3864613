//! Dialect-agnostic query model.
//!
//! A [`Query`] names an entity and carries an optional [`Predicate`] tree,
//! sort keys, pagination bounds and projected fields. Trees are built fresh
//! for each query and are never mutated once compilation starts.

use crate::value::RuntimeValue;
use std::fmt;
use std::ops::Not;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// SQL wildcard match (`%`, `_`); translated per dialect
    Like,
    /// Membership; the operand must be a list
    In,
    /// Inclusive range; the operand must hold exactly two bounds
    Between,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eq => "EQ",
            Self::Gt => "GT",
            Self::Gte => "GTE",
            Self::Lt => "LT",
            Self::Lte => "LTE",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::Between => "BETWEEN",
        };
        f.write_str(name)
    }
}

/// Boolean junction of a conjunction node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Junction {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IdentifierKind {
    #[default]
    Field,
    /// The record identifier; rendered through the dialect's native accessor.
    LogicalId,
}

/// A field reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    pub kind: IdentifierKind,
}

impl Identifier {
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IdentifierKind::Field,
        }
    }

    pub fn logical_id(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IdentifierKind::LogicalId,
        }
    }

    /// Whether this names the record identifier, either explicitly or per
    /// the entity's metadata.
    pub fn is_logical_id(&self, resolver: &dyn IdentifierResolver) -> bool {
        self.kind == IdentifierKind::LogicalId || resolver.is_logical_id(&self.name)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self::field(name)
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Self::field(name)
    }
}

/// Tells which field name is an entity's logical identifier.
pub trait IdentifierResolver: Send + Sync {
    fn is_logical_id(&self, field: &str) -> bool;
}

impl<F> IdentifierResolver for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_logical_id(&self, field: &str) -> bool {
        self(field)
    }
}

/// Per-entity metadata: the one canonical identifier field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    pub id_field: String,
}

impl EntityMetadata {
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
        }
    }
}

impl Default for EntityMetadata {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdentifierResolver for EntityMetadata {
    fn is_logical_id(&self, field: &str) -> bool {
        self.id_field == field
    }
}

/// One node of a boolean filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison {
        field: Identifier,
        op: Op,
        operand: RuntimeValue,
    },
    Not(Box<Predicate>),
    /// Children in evaluation order; at least one is required.
    Conjunction {
        op: Junction,
        children: Vec<Predicate>,
    },
}

impl Predicate {
    pub fn compare(
        field: impl Into<Identifier>,
        op: Op,
        operand: impl Into<RuntimeValue>,
    ) -> Self {
        Self::Comparison {
            field: field.into(),
            op,
            operand: operand.into(),
        }
    }

    pub fn eq(field: impl Into<Identifier>, operand: impl Into<RuntimeValue>) -> Self {
        Self::compare(field, Op::Eq, operand)
    }

    pub fn gt(field: impl Into<Identifier>, operand: impl Into<RuntimeValue>) -> Self {
        Self::compare(field, Op::Gt, operand)
    }

    pub fn gte(field: impl Into<Identifier>, operand: impl Into<RuntimeValue>) -> Self {
        Self::compare(field, Op::Gte, operand)
    }

    pub fn lt(field: impl Into<Identifier>, operand: impl Into<RuntimeValue>) -> Self {
        Self::compare(field, Op::Lt, operand)
    }

    pub fn lte(field: impl Into<Identifier>, operand: impl Into<RuntimeValue>) -> Self {
        Self::compare(field, Op::Lte, operand)
    }

    /// LIKE match; `pattern` uses `%` and `_` wildcards.
    pub fn like(field: impl Into<Identifier>, pattern: impl Into<RuntimeValue>) -> Self {
        Self::compare(field, Op::Like, pattern)
    }

    pub fn is_in(field: impl Into<Identifier>, values: impl Into<RuntimeValue>) -> Self {
        Self::compare(field, Op::In, values)
    }

    /// Inclusive range, bound as one two-element parameter
    pub fn between(
        field: impl Into<Identifier>,
        low: impl Into<RuntimeValue>,
        high: impl Into<RuntimeValue>,
    ) -> Self {
        let pair: [RuntimeValue; 2] = [low.into(), high.into()];
        Self::compare(field, Op::Between, RuntimeValue::array(pair))
    }

    /// AND over `children`. An empty list fails to compile.
    pub fn all(children: Vec<Predicate>) -> Self {
        Self::Conjunction {
            op: Junction::And,
            children,
        }
    }

    pub fn any(children: Vec<Predicate>) -> Self {
        Self::Conjunction {
            op: Junction::Or,
            children,
        }
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// `self AND other`, applied left to right: extends an AND node, wraps
    /// anything else.
    pub fn and(self, other: Predicate) -> Self {
        self.join(Junction::And, other)
    }

    /// `self OR other`, applied left to right.
    pub fn or(self, other: Predicate) -> Self {
        self.join(Junction::Or, other)
    }

    fn join(self, junction: Junction, other: Predicate) -> Self {
        match self {
            Self::Conjunction { op, mut children } if op == junction => {
                children.push(other);
                Self::Conjunction { op, children }
            }
            lhs => Self::Conjunction {
                op: junction,
                children: vec![lhs, other],
            },
        }
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: Identifier,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(field: impl Into<Identifier>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<Identifier>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// A query request against one entity (collection, table or label).
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection, table or label name, emitted unquoted
    pub entity: String,
    /// `None` matches every record
    pub predicate: Option<Predicate>,
    /// Applied in order; earlier keys take precedence
    pub sort: Vec<SortKey>,
    /// 0 = no skip
    pub skip: u64,
    /// 0 = unbounded
    pub limit: u64,
    /// Empty = whole record
    pub fields: Vec<String>,
    /// Decides which field names mean the record identifier
    pub metadata: EntityMetadata,
}

impl Query {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            predicate: None,
            sort: Vec::new(),
            skip: 0,
            limit: 0,
            fields: Vec::new(),
            metadata: EntityMetadata::default(),
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Name of the entity's logical identifier field (default `id`).
    pub fn id_field(mut self, name: impl Into<String>) -> Self {
        self.metadata = EntityMetadata::new(name);
        self
    }
}

/// One end of a relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEndpoint {
    /// Entity (label, collection) of the record, when the dialect needs it.
    pub entity: Option<String>,
    pub id: RuntimeValue,
}

impl EdgeEndpoint {
    pub fn new(id: impl Into<RuntimeValue>) -> Self {
        Self {
            entity: None,
            id: id.into(),
        }
    }

    pub fn in_entity(entity: impl Into<String>, id: impl Into<RuntimeValue>) -> Self {
        Self {
            entity: Some(entity.into()),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeMode {
    #[default]
    Create,
    /// Match an existing relationship or create it.
    Merge,
}

/// A directed relationship from `source` to `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRequest {
    pub source: EdgeEndpoint,
    pub target: EdgeEndpoint,
    pub label: String,
    pub properties: Vec<(String, RuntimeValue)>,
    pub mode: EdgeMode,
}

impl EdgeRequest {
    pub fn new(source: EdgeEndpoint, label: impl Into<String>, target: EdgeEndpoint) -> Self {
        Self {
            source,
            target,
            label: label.into(),
            properties: Vec::new(),
            mode: EdgeMode::Create,
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<RuntimeValue>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn merge(mut self) -> Self {
        self.mode = EdgeMode::Merge;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_chain_extends_same_junction() {
        let p = Predicate::eq("a", 1i32)
            .and(Predicate::eq("b", 2i32))
            .and(Predicate::eq("c", 3i32));

        let Predicate::Conjunction { op, children } = p else {
            panic!("expected conjunction");
        };
        assert_eq!(op, Junction::And);
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn test_mixed_chain_folds_left() {
        // (a AND b) OR c
        let p = Predicate::eq("a", 1i32)
            .and(Predicate::eq("b", 2i32))
            .or(Predicate::eq("c", 3i32));

        let Predicate::Conjunction { op, children } = p else {
            panic!("expected conjunction");
        };
        assert_eq!(op, Junction::Or);
        assert!(matches!(
            &children[0],
            Predicate::Conjunction {
                op: Junction::And,
                ..
            }
        ));
    }

    #[test]
    fn test_not_operator() {
        let p = !Predicate::eq("a", 1i32);
        assert!(matches!(p, Predicate::Not(_)));
    }

    #[test]
    fn test_between_builds_pair() {
        let Predicate::Comparison { operand, .. } = Predicate::between("age", 18i32, 65i32) else {
            panic!("expected comparison");
        };
        assert_eq!(operand.as_sequence().map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_identifier_resolution() {
        let meta = EntityMetadata::new("_key");

        assert!(Identifier::field("_key").is_logical_id(&meta));
        assert!(!Identifier::field("name").is_logical_id(&meta));
        assert!(Identifier::logical_id("anything").is_logical_id(&meta));

        let closure = |f: &str| f == "uid";
        assert!(Identifier::field("uid").is_logical_id(&closure));
    }
}
