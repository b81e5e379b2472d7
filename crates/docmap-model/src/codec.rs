//! Wire codecs for structured datastream payloads.
//!
//! Structured datastreams are a flat XML field document:
//!
//! ```text
//! <fields><title>Hydra for Dummies</title><title>2nd ed.</title></fields>
//! ```
//!
//! Element order is the map's key order, values in insertion order. RDF
//! payloads use the N-Triples codec on [`Triple`](docmap_types::Triple).

use std::collections::BTreeMap;

/// Field name → ordered values.
pub type FieldMap = BTreeMap<String, Vec<String>>;

const ROOT: &str = "fields";

/// Whether `name` can be used as an element name.
pub fn is_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn escape(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}

fn unescape(text: &str) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let end = tail.find(';').ok_or("unterminated entity")?;
        let c = match &tail[1..end] {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            other => return Err(format!("unknown entity &{other};")),
        };
        out.push(c);
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

pub fn encode_fields(fields: &FieldMap) -> Vec<u8> {
    let mut out = format!("<{ROOT}>");
    for (name, values) in fields {
        for value in values {
            out.push('<');
            out.push_str(name);
            out.push('>');
            escape(value, &mut out);
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
    out.push_str(&format!("</{ROOT}>"));
    out.into_bytes()
}

/// Decode a field document. Empty input decodes to an empty map.
pub fn decode_fields(bytes: &[u8]) -> Result<FieldMap, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?.trim();
    let mut fields = FieldMap::new();
    if text.is_empty() {
        return Ok(fields);
    }

    let text = match text.strip_prefix("<?xml") {
        Some(decl) => {
            let end = decl.find("?>").ok_or("unterminated XML declaration")?;
            decl[end + 2..].trim_start()
        }
        None => text,
    };
    if text == format!("<{ROOT}/>") {
        return Ok(fields);
    }
    let mut body = text
        .strip_prefix(&format!("<{ROOT}>"))
        .and_then(|t| t.strip_suffix(&format!("</{ROOT}>")))
        .ok_or_else(|| format!("expected a <{ROOT}> document"))?
        .trim();

    while !body.is_empty() {
        let open_end = body.find('>').ok_or("unterminated element")?;
        let tag = body
            .strip_prefix('<')
            .map(|t| &t[..open_end - 1])
            .ok_or("expected an element")?;

        if let Some(name) = tag.strip_suffix('/') {
            let name = name.trim_end();
            if !is_field_name(name) {
                return Err(format!("invalid element name {name:?}"));
            }
            fields.entry(name.to_string()).or_default().push(String::new());
            body = body[open_end + 1..].trim_start();
            continue;
        }
        if !is_field_name(tag) {
            return Err(format!("invalid element name {tag:?}"));
        }
        let after = &body[open_end + 1..];
        let close = format!("</{tag}>");
        let close_at = after.find(&close).ok_or_else(|| format!("missing {close}"))?;
        let raw = &after[..close_at];
        if raw.contains('<') {
            return Err(format!("element <{tag}> has nested markup"));
        }
        fields.entry(tag.to_string()).or_default().push(unescape(raw)?);
        body = after[close_at + close.len()..].trim_start();
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map(pairs: &[(&str, &[&str])]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn encodes_repeated_fields_in_order() {
        let fields = map(&[("title", &["Hydra", "2nd <ed>"]), ("author", &["A & B"])]);
        let xml = String::from_utf8(encode_fields(&fields)).unwrap();
        assert_eq!(
            xml,
            "<fields><author>A &amp; B</author><title>Hydra</title><title>2nd &lt;ed&gt;</title></fields>"
        );
        assert_eq!(decode_fields(xml.as_bytes()).unwrap(), fields);
    }

    #[test]
    fn decodes_declaration_whitespace_and_empty_elements() {
        let xml = "<?xml version=\"1.0\"?>\n<fields>\n  <title>Dune</title>\n  <note/>\n</fields>\n";
        let fields = decode_fields(xml.as_bytes()).unwrap();
        assert_eq!(fields, map(&[("note", &[""]), ("title", &["Dune"])]));
        assert!(decode_fields(b"").unwrap().is_empty());
        assert!(decode_fields(b"<fields/>").unwrap().is_empty());
    }

    #[test]
    fn rejects_foreign_documents() {
        assert!(decode_fields(b"<mods><title>x</title></mods>").is_err());
        assert!(decode_fields(b"<fields><a><b>x</b></a></fields>").is_err());
        assert!(decode_fields(b"<fields><a>&bogus;</a></fields>").is_err());
        assert!(decode_fields(b"<fields><a>open</fields>").is_err());
    }

    #[test]
    fn field_names() {
        assert!(is_field_name("title"));
        assert!(is_field_name("dc.title-2"));
        assert!(!is_field_name("2nd"));
        assert!(!is_field_name("a b"));
        assert!(!is_field_name(""));
    }

    proptest! {
        #[test]
        fn any_text_value_survives(value in "\\PC{0,32}") {
            let fields = map(&[("v", &[value.as_str()])]);
            let decoded = decode_fields(&encode_fields(&fields)).unwrap();
            prop_assert_eq!(&decoded["v"][0], &value);
        }
    }
}
