//! Value coercion.
//!
//! Converts runtime values into the parameter representation a dialect
//! binds. Dispatch walks a fixed, ordered rule table; the first rule that
//! claims a value decides its coercion.

use crate::error::CoerceError;
use num_bigint::BigInt;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A parameter value in the form drivers bind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// True only for an explicit null, not for empty strings or lists
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text of a string value; `None` for every other kind.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to JSON for drivers that bind JSON documents.
    ///
    /// Non-finite floats have no JSON form and become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(n) => JsonValue::from(*n),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Bytes(bytes) => JsonValue::Array(bytes.iter().map(|b| (*b).into()).collect()),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A value as the query-building layer hands it over.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    Null,
    /// Already in dialect form; passed through untouched.
    Native(ParamValue),
    String(String),
    /// Fixed-width integers up to 32 bits.
    Int(i32),
    Long(i64),
    Float(f64),
    Bool(bool),
    /// Arbitrary precision; bound as its decimal string.
    BigInt(BigInt),
    Bytes(Vec<u8>),
    /// Bound by symbolic variant name, never by ordinal.
    Enum {
        type_name: String,
        variant: String,
    },
    List(Vec<RuntimeValue>),
    Array(Box<[RuntimeValue]>),
    Map(Vec<(RuntimeValue, RuntimeValue)>),
    /// A foreign value with no coercion.
    Opaque {
        type_name: String,
    },
}

impl RuntimeValue {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    pub fn enumeration(type_name: impl Into<String>, variant: impl Into<String>) -> Self {
        Self::Enum {
            type_name: type_name.into(),
            variant: variant.into(),
        }
    }

    pub fn opaque(type_name: impl Into<String>) -> Self {
        Self::Opaque {
            type_name: type_name.into(),
        }
    }

    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RuntimeValue>,
    {
        Self::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<RuntimeValue>,
        V: Into<RuntimeValue>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Descriptive type name used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Native(_) => "native".to_string(),
            Self::String(_) => "string".to_string(),
            Self::Int(_) => "i32".to_string(),
            Self::Long(_) => "i64".to_string(),
            Self::Float(_) => "f64".to_string(),
            Self::Bool(_) => "bool".to_string(),
            Self::BigInt(_) => "bigint".to_string(),
            Self::Bytes(_) => "bytes".to_string(),
            Self::Enum { type_name, .. } => type_name.clone(),
            Self::List(_) => "list".to_string(),
            Self::Array(items) => format!("array[{}]", items.len()),
            Self::Map(_) => "map".to_string(),
            Self::Opaque { type_name } => type_name.clone(),
        }
    }

    /// Elements of a list or fixed-size array.
    pub fn as_sequence(&self) -> Option<&[RuntimeValue]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            Self::Array(items) => Some(&items[..]),
            _ => None,
        }
    }

    /// String text, including an already-coerced native string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Native(ParamValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Native(ParamValue::Null))
    }
}

macro_rules! runtime_from {
    ($variant:ident: $($ty:ty),+) => {
        $(impl From<$ty> for RuntimeValue {
            fn from(v: $ty) -> Self {
                Self::$variant(v.into())
            }
        })+
    };
}

runtime_from!(Int: i8, i16, i32, u8, u16);
runtime_from!(Long: i64, u32);
runtime_from!(Float: f32, f64);
runtime_from!(BigInt: u64, i128, u128, BigInt);
runtime_from!(Bool: bool);
runtime_from!(String: String, &str);
runtime_from!(Native: ParamValue);

impl<T: Into<RuntimeValue>> From<Vec<T>> for RuntimeValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<RuntimeValue>> From<Option<T>> for RuntimeValue {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Self::Null)
    }
}

impl From<JsonValue> for RuntimeValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Long(i)
                } else if let Some(u) = n.as_u64() {
                    Self::BigInt(u.into())
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::List(items.into_iter().map(Into::into).collect()),
            JsonValue::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (Self::String(k), v.into()))
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// Rule table
// ============================================================================

type RuleFn = fn(&RuntimeValue) -> Option<Result<ParamValue, CoerceError>>;

/// One entry of the coercion dispatch table.
pub struct CoercionRule {
    name: &'static str,
    apply: RuleFn,
}

impl CoercionRule {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `None` if this rule does not claim the value.
    pub fn apply(&self, value: &RuntimeValue) -> Option<Result<ParamValue, CoerceError>> {
        (self.apply)(value)
    }
}

static COERCION_RULES: Lazy<Vec<CoercionRule>> = Lazy::new(|| {
    vec![
        CoercionRule {
            name: "null",
            apply: |v| matches!(v, RuntimeValue::Null).then_some(Ok(ParamValue::Null)),
        },
        CoercionRule {
            name: "native",
            apply: |v| match v {
                RuntimeValue::Native(native) => Some(Ok(native.clone())),
                _ => None,
            },
        },
        CoercionRule {
            name: "string",
            apply: |v| match v {
                RuntimeValue::String(s) => Some(Ok(ParamValue::String(s.clone()))),
                _ => None,
            },
        },
        CoercionRule {
            name: "int",
            apply: |v| match v {
                RuntimeValue::Int(n) => Some(Ok(ParamValue::Int(i64::from(*n)))),
                _ => None,
            },
        },
        CoercionRule {
            name: "long",
            apply: |v| match v {
                RuntimeValue::Long(n) => Some(Ok(ParamValue::Int(*n))),
                _ => None,
            },
        },
        CoercionRule {
            name: "float",
            apply: |v| match v {
                RuntimeValue::Float(f) => Some(Ok(ParamValue::Float(*f))),
                _ => None,
            },
        },
        CoercionRule {
            name: "bool",
            apply: |v| match v {
                RuntimeValue::Bool(b) => Some(Ok(ParamValue::Bool(*b))),
                _ => None,
            },
        },
        CoercionRule {
            name: "bigint",
            apply: |v| match v {
                RuntimeValue::BigInt(n) => Some(Ok(ParamValue::String(n.to_string()))),
                _ => None,
            },
        },
        CoercionRule {
            name: "bytes",
            apply: |v| match v {
                RuntimeValue::Bytes(bytes) => Some(Ok(ParamValue::Bytes(bytes.clone()))),
                _ => None,
            },
        },
        CoercionRule {
            name: "enum",
            apply: |v| match v {
                RuntimeValue::Enum { variant, .. } => Some(Ok(ParamValue::String(variant.clone()))),
                _ => None,
            },
        },
        CoercionRule {
            name: "list",
            apply: |v| match v {
                RuntimeValue::List(items) => Some(coerce_all(items)),
                _ => None,
            },
        },
        CoercionRule {
            name: "array",
            apply: |v| match v {
                RuntimeValue::Array(items) => Some(coerce_all(items)),
                _ => None,
            },
        },
        CoercionRule {
            name: "map",
            apply: |v| match v {
                RuntimeValue::Map(entries) => Some(coerce_map(entries)),
                _ => None,
            },
        },
    ]
});

/// The dispatch table, in match order.
pub fn coercion_rules() -> &'static [CoercionRule] {
    &COERCION_RULES[..]
}

/// Coerce a runtime value into its parameter form.
pub fn coerce(value: &RuntimeValue) -> Result<ParamValue, CoerceError> {
    coercion_rules()
        .iter()
        .find_map(|rule| rule.apply(value))
        .unwrap_or_else(|| {
            Err(CoerceError::UnsupportedValueType {
                type_name: value.type_name(),
            })
        })
}

fn coerce_all(items: &[RuntimeValue]) -> Result<ParamValue, CoerceError> {
    items
        .iter()
        .map(coerce)
        .collect::<Result<Vec<_>, _>>()
        .map(ParamValue::List)
}

fn coerce_map(entries: &[(RuntimeValue, RuntimeValue)]) -> Result<ParamValue, CoerceError> {
    let mut map = BTreeMap::new();
    for (key, value) in entries {
        let key = key.as_str().ok_or_else(|| CoerceError::NonStringKey {
            key_type: key.type_name(),
        })?;
        map.insert(key.to_string(), coerce(value)?);
    }
    Ok(ParamValue::Map(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    // =========================================================================
    // Scalars
    // =========================================================================

    #[test_case(RuntimeValue::Null, ParamValue::Null ; "null")]
    #[test_case("text".into(), ParamValue::String("text".into()) ; "string")]
    #[test_case(7i16.into(), ParamValue::Int(7) ; "short")]
    #[test_case(42i32.into(), ParamValue::Int(42) ; "int")]
    #[test_case(9_000_000_000i64.into(), ParamValue::Int(9_000_000_000) ; "long")]
    #[test_case(1.5f64.into(), ParamValue::Float(1.5) ; "double")]
    #[test_case(true.into(), ParamValue::Bool(true) ; "bool")]
    fn test_coerce_scalar(input: RuntimeValue, expected: ParamValue) {
        assert_eq!(coerce(&input).unwrap(), expected);
    }

    #[test]
    fn test_bigint_renders_decimal_string() {
        let big: BigInt = "123456789012345678901234567890".parse().unwrap();
        let result = coerce(&RuntimeValue::BigInt(big)).unwrap();

        assert_eq!(
            result,
            ParamValue::String("123456789012345678901234567890".to_string())
        );
    }

    #[test]
    fn test_u64_keeps_precision() {
        let result = coerce(&u64::MAX.into()).unwrap();
        assert_eq!(result, ParamValue::String(u64::MAX.to_string()));
    }

    #[test]
    fn test_enum_uses_variant_name() {
        let value = RuntimeValue::enumeration("Status", "ACTIVE");
        assert_eq!(coerce(&value).unwrap(), ParamValue::String("ACTIVE".into()));
    }

    #[test]
    fn test_bytes_pass_as_bytes() {
        let value = RuntimeValue::bytes(vec![0xde, 0xad]);
        assert_eq!(coerce(&value).unwrap(), ParamValue::Bytes(vec![0xde, 0xad]));
    }

    // =========================================================================
    // Composites
    // =========================================================================

    #[test]
    fn test_list_preserves_order() {
        let value: RuntimeValue = vec![3i32, 1, 2].into();
        assert_eq!(
            coerce(&value).unwrap(),
            ParamValue::List(vec![
                ParamValue::Int(3),
                ParamValue::Int(1),
                ParamValue::Int(2)
            ])
        );
    }

    #[test]
    fn test_array_coerced_by_index() {
        let value = RuntimeValue::array(["a", "b"]);
        assert_eq!(
            coerce(&value).unwrap(),
            ParamValue::List(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_nested_map() {
        let value = RuntimeValue::map([
            ("name", RuntimeValue::from("Ada")),
            ("tags", vec!["x", "y"].into()),
            ("status", RuntimeValue::enumeration("Status", "ON")),
        ]);

        let ParamValue::Map(map) = coerce(&value).unwrap() else {
            panic!("expected map");
        };
        assert_eq!(map["name"], ParamValue::String("Ada".into()));
        assert_eq!(map["tags"], ParamValue::List(vec!["x".into(), "y".into()]));
        assert_eq!(map["status"], ParamValue::String("ON".into()));
    }

    #[test]
    fn test_non_string_key_rejected() {
        let value = RuntimeValue::map([(RuntimeValue::Int(1), RuntimeValue::from("one"))]);

        assert_eq!(
            coerce(&value),
            Err(CoerceError::NonStringKey {
                key_type: "i32".to_string()
            })
        );
    }

    #[test]
    fn test_opaque_rejected_with_type_name() {
        let value = RuntimeValue::opaque("std::time::Instant");

        assert_eq!(
            coerce(&value),
            Err(CoerceError::UnsupportedValueType {
                type_name: "std::time::Instant".to_string()
            })
        );
    }

    #[test]
    fn test_opaque_inside_list_fails_whole_list() {
        let value = RuntimeValue::List(vec![1i32.into(), RuntimeValue::opaque("Socket")]);
        assert!(coerce(&value).is_err());
    }

    // =========================================================================
    // Dispatch table
    // =========================================================================

    #[test]
    fn test_native_passthrough_is_idempotent() {
        let original = RuntimeValue::map([("n", RuntimeValue::from(vec![1i64, 2]))]);
        let once = coerce(&original).unwrap();
        let twice = coerce(&RuntimeValue::Native(once.clone())).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_exactly_one_rule_claims_each_shape() {
        let samples = [
            RuntimeValue::Null,
            RuntimeValue::Native(ParamValue::Null),
            "s".into(),
            1i32.into(),
            1i64.into(),
            1.0f64.into(),
            false.into(),
            RuntimeValue::BigInt(1.into()),
            RuntimeValue::bytes(vec![1]),
            RuntimeValue::enumeration("E", "A"),
            RuntimeValue::List(vec![]),
            RuntimeValue::array(Vec::<i32>::new()),
            RuntimeValue::Map(vec![]),
        ];

        for sample in &samples {
            let claims = coercion_rules()
                .iter()
                .filter(|rule| rule.apply(sample).is_some())
                .count();
            assert_eq!(claims, 1, "{} claimed {} times", sample.type_name(), claims);
        }
    }

    #[test]
    fn test_rule_order_starts_with_null_and_native() {
        let names: Vec<_> = coercion_rules().iter().map(|r| r.name()).collect();
        assert_eq!(&names[..3], &["null", "native", "string"]);
        assert_eq!(names.last(), Some(&"map"));
    }

    // =========================================================================
    // JSON interop
    // =========================================================================

    #[test]
    fn test_from_json_and_back() {
        let json = serde_json::json!({"a": [1, "two", null], "b": true});
        let param = coerce(&RuntimeValue::from(json.clone())).unwrap();

        assert_eq!(param.to_json(), json);
    }

    #[test]
    fn test_param_serializes_untagged() {
        let param = ParamValue::List(vec![ParamValue::Null, ParamValue::Int(3)]);
        assert_eq!(serde_json::to_string(&param).unwrap(), "[null,3]");
    }
}
