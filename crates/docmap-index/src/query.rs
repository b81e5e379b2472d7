//! The query-string clause grammar.
//!
//! Queries are conjunctions of clauses joined with the literal `" AND "`:
//!
//! ```text
//! query   := clause (" AND " clause)*
//! clause  := "*:*" | "(" query ")" | field ":" value
//!          | "_query_:\"{!raw f=" field "}" raw-value "\""
//! value   := "\"" escaped "\"" | "*" | bare-token
//! ```
//!
//! Inside a quoted value an embedded `"` is written `\"` and a backslash
//! `\\`; no other escapes exist. The finder builds strings in this grammar;
//! [`Query::parse`] reads them back so that the in-memory index can evaluate
//! them.

use crate::document::IndexDocument;
use crate::error::{IndexError, IndexResult};

/// The query matching every document.
pub const MATCH_ALL: &str = "*:*";

const AND: &str = " AND ";
const RAW_PREFIX: &str = "{!raw f=";

/// Quote-escape a clause value: `9" Nails` → `9\" Nails`, `C:\` → `C:\\`.
pub fn escape_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A quoted exact-match clause: `field:"escaped value"`.
pub fn term_clause(field: &str, value: &str) -> String {
    format!("{field}:\"{}\"", escape_value(value))
}

/// One conjunct of a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Clause {
    /// `*:*`
    MatchAll,
    /// `field:"value"` or `field:value`; matches any equal value.
    Term { field: String, value: String },
    /// `field:*`; matches documents carrying the field.
    Exists { field: String },
    /// `_query_:"{!raw f=field}value"`; unanalyzed exact match.
    Raw { field: String, value: String },
    /// A parenthesized sub-query.
    Group(Query),
}

impl Clause {
    fn matches(&self, doc: &IndexDocument) -> bool {
        match self {
            Self::MatchAll => true,
            Self::Term { field, value } | Self::Raw { field, value } => doc
                .get(field)
                .is_some_and(|values| values.iter().any(|v| v == value)),
            Self::Exists { field } => doc.contains(field),
            Self::Group(query) => query.matches(doc),
        }
    }
}

/// A parsed conjunctive query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    clauses: Vec<Clause>,
}

impl Query {
    /// Parse a query string in the clause grammar.
    pub fn parse(q: &str) -> IndexResult<Self> {
        let unsupported = |reason: &str| IndexError::UnsupportedQuery {
            query: q.to_string(),
            reason: reason.to_string(),
        };

        let clauses = split_conjuncts(q)
            .map_err(|reason| unsupported(&reason))?
            .into_iter()
            .map(|part| parse_clause(part).map_err(|reason| unsupported(&reason)))
            .collect::<IndexResult<Vec<_>>>()?;
        Ok(Self { clauses })
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Returns `true` if every clause matches the document.
    pub fn matches(&self, doc: &IndexDocument) -> bool {
        self.clauses.iter().all(|c| c.matches(doc))
    }
}

/// Split on top-level `" AND "`, ignoring separators inside quotes or
/// parentheses.
fn split_conjuncts(q: &str) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    let bytes = q.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes && b == b'(' {
            depth += 1;
        } else if !in_quotes && b == b')' {
            depth = depth.checked_sub(1).ok_or("unbalanced ')'")?;
        } else if !in_quotes && depth == 0 && bytes[i..].starts_with(AND.as_bytes()) {
            parts.push(&q[start..i]);
            i += AND.len();
            start = i;
            continue;
        }
        i += 1;
    }
    if in_quotes {
        return Err("unterminated quoted value".into());
    }
    if depth != 0 {
        return Err("unbalanced '('".into());
    }
    parts.push(&q[start..]);
    Ok(parts)
}

fn parse_clause(raw: &str) -> Result<Clause, String> {
    let clause = raw.trim();
    if clause.is_empty() {
        return Err("empty clause".into());
    }
    if clause == MATCH_ALL {
        return Ok(Clause::MatchAll);
    }
    if let Some(inner) = strip_wrapping_parens(clause) {
        let query = Query::parse(inner).map_err(|e| e.to_string())?;
        return Ok(Clause::Group(query));
    }

    let (field, value) = clause
        .split_once(':')
        .ok_or_else(|| format!("clause {clause:?} has no field"))?;
    if field.is_empty() {
        return Err(format!("clause {clause:?} has an empty field name"));
    }

    if field == "_query_" {
        let local = unquote(value).ok_or("nested query must be quoted")?;
        let rest = local
            .strip_prefix(RAW_PREFIX)
            .ok_or("only {!raw f=...} nested queries are supported")?;
        let (raw_field, raw_value) = rest.split_once('}').ok_or("unterminated local params")?;
        return Ok(Clause::Raw {
            field: raw_field.to_string(),
            value: raw_value.to_string(),
        });
    }

    if value == "*" {
        return Ok(Clause::Exists {
            field: field.to_string(),
        });
    }
    let value = match unquote(value) {
        Some(v) => v,
        None if value.starts_with('"') => return Err("malformed quoted value".into()),
        None => unescape(value),
    };
    Ok(Clause::Term {
        field: field.to_string(),
        value,
    })
}

/// `"..."` → unescaped body, if the whole value is one quoted string.
fn unquote(value: &str) -> Option<String> {
    let body = value.strip_prefix('"')?.strip_suffix('"')?;
    let mut escaped = false;
    for c in body.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return None;
        }
    }
    if escaped {
        return None;
    }
    Some(unescape(body))
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Strip one pair of parentheses if they enclose the entire clause.
fn strip_wrapping_parens(clause: &str) -> Option<&str> {
    let inner = clause.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}
