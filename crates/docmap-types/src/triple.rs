//! A minimal N-Triples statement type.
//!
//! Only the subset the mapping layer writes is supported: IRI subjects and
//! predicates, and either IRI or plain literal objects.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Object position of a triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Uri(String),
    Literal(String),
}

impl Term {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uri(s) | Self::Literal(s) => s,
        }
    }
}

/// One RDF statement.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }

    /// Serialize a graph, one statement per line.
    pub fn serialize_all(triples: &[Triple]) -> String {
        triples.iter().map(|t| format!("{t}\n")).collect()
    }

    /// Parse an N-Triples document. Blank lines and `#` comments are skipped.
    pub fn parse_all(text: &str) -> Result<Vec<Triple>, TypeError> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .map(|(idx, line)| parse_line(line.trim(), idx + 1))
            .collect()
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> <{}> ", self.subject, self.predicate)?;
        match &self.object {
            Term::Uri(uri) => write!(f, "<{uri}> .")?,
            Term::Literal(lit) => write!(f, "\"{}\" .", escape_literal(lit))?,
        }
        Ok(())
    }
}

fn escape_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn parse_line(line: &str, line_no: usize) -> Result<Triple, TypeError> {
    let malformed = |reason: &str| TypeError::MalformedTriple {
        line: line_no,
        reason: reason.to_string(),
    };

    let (subject, rest) = take_iri(line).ok_or_else(|| malformed("expected subject IRI"))?;
    let (predicate, rest) =
        take_iri(rest.trim_start()).ok_or_else(|| malformed("expected predicate IRI"))?;
    let rest = rest.trim_start();

    let (object, rest) = if rest.starts_with('<') {
        let (iri, rest) = take_iri(rest).ok_or_else(|| malformed("unterminated object IRI"))?;
        (Term::Uri(iri), rest)
    } else if let Some(body) = rest.strip_prefix('"') {
        let (lit, rest) = take_literal(body).ok_or_else(|| malformed("unterminated literal"))?;
        (Term::Literal(lit), rest)
    } else {
        return Err(malformed("expected IRI or literal object"));
    };

    if rest.trim() != "." {
        return Err(malformed("expected terminating '.'"));
    }
    Ok(Triple {
        subject,
        predicate,
        object,
    })
}

fn take_iri(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('<')?;
    let end = body.find('>')?;
    Some((body[..end].to_string(), &body[end + 1..]))
}

fn take_literal(body: &str) -> Option<(String, &str)> {
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Some((out, &body[idx + 1..])),
            '\\' => match chars.next()?.1 {
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                other => out.push(other),
            },
            other => out.push(other),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HAS_MODEL: &str = "info:fedora/fedora-system:def/model#hasModel";

    #[test]
    fn display_uri_object() {
        let t = Triple::new(
            "info:fedora/changeme:30",
            HAS_MODEL,
            Term::Uri("info:fedora/afmodel:SpecModel_Basic".into()),
        );
        assert_eq!(
            t.to_string(),
            "<info:fedora/changeme:30> <info:fedora/fedora-system:def/model#hasModel> <info:fedora/afmodel:SpecModel_Basic> ."
        );
    }

    #[test]
    fn parse_document_with_literals_and_comments() {
        let doc = "# header\n\
            <info:fedora/a:1> <http://purl.org/dc/terms/title> \"9\\\" Nails\" .\n\
            \n\
            <info:fedora/a:1> <urn:p> <urn:o> .\n";
        let triples = Triple::parse_all(doc).unwrap();
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].object, Term::Literal("9\" Nails".into()));
        assert_eq!(triples[1].object, Term::Uri("urn:o".into()));
    }

    #[test]
    fn serialize_then_parse_preserves_escapes() {
        let graph = vec![Triple::new("urn:s", "urn:p", Term::Literal("line\none \\ \"two\"".into()))];
        let text = Triple::serialize_all(&graph);
        assert_eq!(Triple::parse_all(&text).unwrap(), graph);
    }

    #[test]
    fn malformed_lines_report_line_number() {
        let err = Triple::parse_all("<urn:s> <urn:p> <urn:o> .\n<urn:s> <urn:p> bare .").unwrap_err();
        assert_eq!(
            err,
            TypeError::MalformedTriple {
                line: 2,
                reason: "expected IRI or literal object".into()
            }
        );
        assert!(Triple::parse_all("<urn:s> <urn:p> <urn:o>").is_err());
    }

    proptest! {
        #[test]
        fn any_literal_survives_a_line(value in "[ -~\\n\\té]{0,32}") {
            let graph = vec![Triple::new("urn:s", "urn:p", Term::Literal(value))];
            let text = Triple::serialize_all(&graph);
            prop_assert_eq!(text.lines().count(), 1);
            prop_assert_eq!(Triple::parse_all(&text).unwrap(), graph);
        }
    }
}
