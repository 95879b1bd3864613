//! Predicate compilation.
//!
//! Walks a [`Predicate`] tree in order and renders it with the tokens and
//! operator templates of a [`DialectDescriptor`]. Parameters are collected
//! in the same order as their placeholders appear in the text.

use crate::dialect::{fill_template, DialectDescriptor, LikeStrategy, ParamStyle};
use crate::error::RenderError;
use crate::ir::{Identifier, IdentifierResolver, Junction, Op, Predicate};
use crate::pattern::{SubstringMatch, WildcardPattern, MATCH_NOTHING};
use crate::render::{CompiledStatement, Parameters};
use crate::value::{coerce, ParamValue, RuntimeValue};
use tracing::trace;

/// Collects bound values and hands out placeholders.
#[derive(Debug, Clone)]
pub struct ParamCollector {
    style: ParamStyle,
    logical_id_param: String,
    values: Vec<(String, ParamValue)>,
    filters: usize,
    ids: usize,
}

impl ParamCollector {
    /// Empty collector using the dialect's parameter style and reserved
    /// identifier name.
    pub fn new(dialect: &DialectDescriptor) -> Self {
        Self {
            style: dialect.param_style,
            logical_id_param: dialect.logical_id_param.clone(),
            values: Vec::new(),
            filters: 0,
            ids: 0,
        }
    }

    /// Bind a value under `name` and return its placeholder.
    ///
    /// A name already bound in this statement gets a `_N` suffix, so a
    /// configured identifier name can never collide with a generated one.
    pub fn bind(&mut self, name: impl Into<String>, value: ParamValue) -> String {
        let name = self.unused_name(name.into());
        let placeholder = match self.style {
            ParamStyle::Positional => "?".to_string(),
            ParamStyle::Numbered { sigil } => format!("{}{}", sigil, self.values.len() + 1),
            ParamStyle::Named { sigil } => format!("{}{}", sigil, name),
        };
        self.values.push((name, value));
        placeholder
    }

    /// Bind a comparison operand under the next `filter_N` name.
    pub fn bind_filter(&mut self, value: ParamValue) -> String {
        let name = format!("filter_{}", self.filters);
        self.filters += 1;
        self.bind(name, value)
    }

    /// Bind a logical identifier operand under the reserved name.
    pub fn bind_logical_id(&mut self, value: ParamValue) -> String {
        let name = if self.ids == 0 {
            self.logical_id_param.clone()
        } else {
            format!("{}_{}", self.logical_id_param, self.ids)
        };
        self.ids += 1;
        self.bind(name, value)
    }

    fn unused_name(&self, name: String) -> String {
        let taken = |candidate: &str| self.values.iter().any(|(n, _)| n == candidate);
        if !taken(&name) {
            return name;
        }
        let mut suffix = 1;
        loop {
            let candidate = format!("{}_{}", name, suffix);
            if !taken(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Number of values bound so far
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been bound yet
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Hand the bound values over in the dialect's parameter shape.
    pub fn finish(self) -> Parameters {
        if self.style.is_named() {
            Parameters::Named(self.values)
        } else {
            Parameters::Positional(self.values.into_iter().map(|(_, v)| v).collect())
        }
    }
}

/// Renders predicate trees for one dialect.
pub struct PredicateCompiler<'a> {
    dialect: &'a DialectDescriptor,
    resolver: &'a dyn IdentifierResolver,
}

impl<'a> PredicateCompiler<'a> {
    pub fn new(dialect: &'a DialectDescriptor, resolver: &'a dyn IdentifierResolver) -> Self {
        Self { dialect, resolver }
    }

    /// Compile a standalone filter with its own parameter set.
    pub fn compile(&self, predicate: &Predicate) -> Result<CompiledStatement, RenderError> {
        let mut params = ParamCollector::new(self.dialect);
        let text = self.compile_into(predicate, &mut params)?;
        Ok(CompiledStatement {
            text,
            parameters: params.finish(),
        })
    }

    /// Compile into a statement's shared parameter set.
    pub fn compile_into(
        &self,
        predicate: &Predicate,
        params: &mut ParamCollector,
    ) -> Result<String, RenderError> {
        self.render(predicate, params)
    }

    fn render(&self, node: &Predicate, params: &mut ParamCollector) -> Result<String, RenderError> {
        match node {
            Predicate::Comparison { field, op, operand } => {
                self.render_comparison(field, *op, operand, params)
            }
            Predicate::Not(inner) => {
                let inner = self.render(inner, params)?;
                Ok(format!("{} ({})", self.dialect.not_token, inner))
            }
            Predicate::Conjunction { op, children } => {
                if children.is_empty() {
                    return Err(RenderError::malformed("conjunction has no children"));
                }
                let parts = children
                    .iter()
                    .map(|child| self.render_child(child, *op, params))
                    .collect::<Result<Vec<_>, _>>()?;
                let separator = format!(" {} ", self.dialect.junction_token(*op));
                Ok(parts.join(&separator))
            }
        }
    }

    /// Only an OR nested under an AND needs parentheses; every other
    /// nesting already reads the same flat. Dropping them would regroup
    /// `a AND (b OR c)` as `(a AND b) OR c` (see "Flat AND/OR chains" in
    /// DESIGN.md).
    fn render_child(
        &self,
        child: &Predicate,
        parent: Junction,
        params: &mut ParamCollector,
    ) -> Result<String, RenderError> {
        let rendered = self.render(child, params)?;
        match innermost(child) {
            Predicate::Conjunction {
                op: Junction::Or,
                children,
            } if parent == Junction::And && children.len() > 1 => Ok(format!("({})", rendered)),
            _ => Ok(rendered),
        }
    }

    fn render_comparison(
        &self,
        field: &Identifier,
        op: Op,
        operand: &RuntimeValue,
        params: &mut ParamCollector,
    ) -> Result<String, RenderError> {
        let is_id = field.is_logical_id(self.resolver);
        let column = self.dialect.column_ref(&field.name, is_id);

        if op == Op::Like {
            return self.render_like(field, &column, is_id, operand, params);
        }

        let template = self.template(op)?;
        match op {
            Op::In if sequence_len(operand).is_none() => {
                return Err(RenderError::malformed(format!(
                    "IN on '{}' needs a list operand, got {}",
                    field.name,
                    operand.type_name()
                )));
            }
            Op::Between if sequence_len(operand) != Some(2) => {
                return Err(RenderError::malformed(format!(
                    "BETWEEN on '{}' needs a two-element operand, got {}",
                    field.name,
                    operand.type_name()
                )));
            }
            _ => {}
        }

        let placeholder = self.bind(is_id, coerce(operand)?, params);
        trace!(field = %field.name, op = %op, placeholder = %placeholder, "Rendered comparison");
        Ok(fill_template(template, &column, &placeholder))
    }

    fn render_like(
        &self,
        field: &Identifier,
        column: &str,
        is_id: bool,
        operand: &RuntimeValue,
        params: &mut ParamCollector,
    ) -> Result<String, RenderError> {
        let pattern = if operand.is_null() {
            None
        } else {
            Some(operand.as_str().ok_or_else(|| {
                RenderError::malformed(format!(
                    "LIKE on '{}' needs a string pattern, got {}",
                    field.name,
                    operand.type_name()
                ))
            })?)
        };

        let operators = &self.dialect.operators;
        let (template, value) = match self.dialect.like {
            LikeStrategy::Native => {
                let value = pattern.map_or(ParamValue::Null, ParamValue::from);
                (self.template(Op::Like)?, value)
            }
            LikeStrategy::Regex => self.regex_like(pattern)?,
            LikeStrategy::Substring => {
                let form = pattern.and_then(|p| WildcardPattern::parse(p).substring_form());
                let substring = match form {
                    Some(SubstringMatch::Exact(s)) => operators.eq.map(|t| (t, s)),
                    Some(SubstringMatch::StartsWith(s)) => operators.starts_with.map(|t| (t, s)),
                    Some(SubstringMatch::EndsWith(s)) => operators.ends_with.map(|t| (t, s)),
                    Some(SubstringMatch::Contains(s)) => operators.contains.map(|t| (t, s)),
                    None => None,
                };
                match substring {
                    Some((template, literal)) => (template, ParamValue::String(literal)),
                    None => self.regex_like(pattern)?,
                }
            }
        };

        let placeholder = self.bind(is_id, value, params);
        trace!(field = %field.name, placeholder = %placeholder, "Rendered LIKE");
        Ok(fill_template(template, column, &placeholder))
    }

    fn regex_like(
        &self,
        pattern: Option<&str>,
    ) -> Result<(&'static str, ParamValue), RenderError> {
        let template = self
            .dialect
            .operators
            .regex_match
            .ok_or_else(|| self.unsupported(Op::Like))?;
        let regex = self
            .dialect
            .translate_like(pattern)
            .unwrap_or_else(|| MATCH_NOTHING.to_string());
        Ok((template, ParamValue::String(regex)))
    }

    fn bind(&self, is_id: bool, value: ParamValue, params: &mut ParamCollector) -> String {
        if is_id {
            params.bind_logical_id(value)
        } else {
            params.bind_filter(value)
        }
    }

    fn template(&self, op: Op) -> Result<&'static str, RenderError> {
        self.dialect
            .operators
            .template(op)
            .ok_or_else(|| self.unsupported(op))
    }

    fn unsupported(&self, op: Op) -> RenderError {
        RenderError::UnsupportedOperator {
            op: op.to_string(),
            dialect: self.dialect.name.to_string(),
        }
    }
}

/// Look through single-child conjunctions, which render as their child.
fn innermost(node: &Predicate) -> &Predicate {
    let mut node = node;
    while let Predicate::Conjunction { children, .. } = node {
        match children.as_slice() {
            [only] => node = only,
            _ => break,
        }
    }
    node
}

fn sequence_len(operand: &RuntimeValue) -> Option<usize> {
    match operand {
        RuntimeValue::Native(ParamValue::List(items)) => Some(items.len()),
        other => other.as_sequence().map(<[_]>::len),
    }
}
