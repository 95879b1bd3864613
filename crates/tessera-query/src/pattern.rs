//! LIKE pattern translation.
//!
//! `%` matches any run of characters, `_` exactly one, everything else is
//! literal. Patterns translate to:
//! - the unchanged pattern, for dialects with a native LIKE
//! - an anchored regular expression, with each literal run quoted as one block
//! - a STARTS WITH / ENDS WITH / CONTAINS fragment, when the shape allows it

/// Regex that matches no input at all; the translation of a null pattern.
pub const MATCH_NOTHING: &str = r"[^\s\S]";

/// How literal runs are protected inside a regex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexQuoting {
    /// `\Q...\E` quoting (Java and Neo4j regex engines)
    Block,
    /// Backslash-escape the run in one pass (RE2-style engines).
    ///
    /// Uses `regex::escape`, which escapes each metacharacter on its own.
    /// The text differs from a quoted block but matches exactly the same
    /// strings, which is all the regex engine sees.
    Escape,
}

/// Target form of a translated pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternTarget {
    Like,
    Regex {
        quoting: RegexQuoting,
        /// `false` for "contains" semantics
        anchored: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternToken {
    Literal(String),
    AnyRun,
    AnyChar,
}

/// Substring shapes a pattern can be reduced to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstringMatch {
    Exact(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
}

/// A parsed LIKE pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    tokens: Vec<PatternToken>,
}

impl WildcardPattern {
    pub fn parse(pattern: &str) -> Self {
        let mut tokens = Vec::new();
        let mut literal = String::new();

        for c in pattern.chars() {
            let wildcard = match c {
                '%' => PatternToken::AnyRun,
                '_' => PatternToken::AnyChar,
                other => {
                    literal.push(other);
                    continue;
                }
            };
            if !literal.is_empty() {
                tokens.push(PatternToken::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(wildcard);
        }
        if !literal.is_empty() {
            tokens.push(PatternToken::Literal(literal));
        }

        Self { tokens }
    }

    pub fn tokens(&self) -> &[PatternToken] {
        &self.tokens
    }

    /// Render as a regular expression.
    ///
    /// One `.*` or `.` is emitted per wildcard; adjacent wildcards are not
    /// merged.
    pub fn to_regex(&self, quoting: RegexQuoting, anchored: bool) -> String {
        let mut out = String::new();
        if anchored {
            out.push('^');
        }
        for token in &self.tokens {
            match token {
                PatternToken::Literal(run) => out.push_str(&quote(run, quoting)),
                PatternToken::AnyRun => out.push_str(".*"),
                PatternToken::AnyChar => out.push('.'),
            }
        }
        if anchored {
            out.push('$');
        }
        out
    }

    /// Reduce to a substring test, if the pattern has no `_` and at most
    /// one literal run with wildcards only at the ends.
    pub fn substring_form(&self) -> Option<SubstringMatch> {
        use PatternToken::{AnyRun, Literal};

        match self.tokens.as_slice() {
            [] => Some(SubstringMatch::Exact(String::new())),
            [Literal(s)] => Some(SubstringMatch::Exact(s.clone())),
            [Literal(s), AnyRun] => Some(SubstringMatch::StartsWith(s.clone())),
            [AnyRun, Literal(s)] => Some(SubstringMatch::EndsWith(s.clone())),
            [AnyRun, Literal(s), AnyRun] => Some(SubstringMatch::Contains(s.clone())),
            [AnyRun] => Some(SubstringMatch::Contains(String::new())),
            _ => None,
        }
    }
}

fn quote(run: &str, quoting: RegexQuoting) -> String {
    match quoting {
        // An embedded \E would end the block early, so close, escape it, reopen
        RegexQuoting::Block => format!("\\Q{}\\E", run.replace("\\E", "\\E\\\\E\\Q")),
        RegexQuoting::Escape => regex::escape(run),
    }
}

/// Translate a LIKE pattern for `target`.
///
/// A null pattern stays null for LIKE targets (bound as a null parameter)
/// and becomes [`MATCH_NOTHING`] for regex targets.
pub fn translate(pattern: Option<&str>, target: PatternTarget) -> Option<String> {
    match (pattern, target) {
        (pattern, PatternTarget::Like) => pattern.map(str::to_string),
        (None, PatternTarget::Regex { .. }) => Some(MATCH_NOTHING.to_string()),
        (Some(p), PatternTarget::Regex { quoting, anchored }) => {
            Some(WildcardPattern::parse(p).to_regex(quoting, anchored))
        }
    }
}
