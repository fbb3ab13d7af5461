//! Query block parsing.
//!
//! A user query is a list of blocks joined by `AND`. Each block is either a
//! bare term (`foo bar`), a bare identifier (`http://host/onto.rdf#i1`) or a
//! `field:term` pair.

use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::escape::unescape;
use regex::{Captures, Regex};

static AND_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i) AND ").expect("AND delimiter pattern is valid")
});

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?|file|ftp)://[/:.A-Za-z0-9_\-]+#[A-Za-z0-9_\-]+$")
        .expect("identifier pattern is valid")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&#?[A-Za-z0-9]+;").expect("entity pattern is valid")
});

/// One parsed query segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBlock {
    field: Option<String>,
    term: String,
}

impl QueryBlock {
    /// Creates a block.
    pub fn new(field: Option<String>, term: impl Into<String>) -> Self {
        Self {
            field,
            term: term.into(),
        }
    }

    /// The field, or `None` for a free-text block.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn term(&self) -> &str {
        &self.term
    }
}

/// Makes raw user input safe to embed in a `query_string` query.
///
/// HTML entities are decoded first so that encoded quotes are removed too.
pub fn sanitize(raw: &str) -> String {
    let decoded = decode_html_entities(raw);
    let mut out = String::with_capacity(decoded.len());
    for c in decoded.chars() {
        match c {
            '"' | '\'' => {}
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

/// Splits a sanitized query on case-insensitive ` AND ` delimiters.
pub fn split_blocks(query: &str) -> Vec<&str> {
    AND_DELIMITER.split(query).collect()
}

/// Sanitizes, splits and parses a raw query.
pub fn parse_query(raw: &str) -> Vec<QueryBlock> {
    let sanitized = sanitize(raw);
    split_blocks(&sanitized).into_iter().map(parse_block).collect()
}

/// Parses one block.
pub fn parse_block(block: &str) -> QueryBlock {
    if is_identifier(block.trim()) {
        return QueryBlock::new(None, block.trim());
    }

    let Some(colon) = first_unescaped_colon(block) else {
        return QueryBlock::new(None, block.trim());
    };

    let field = block[..colon].trim();
    let term = block[colon + 1..].trim();

    if field.is_empty() {
        return QueryBlock::new(None, term);
    }

    let field = if is_identifier(&decode_identifier(field)) {
        field.to_string()
    } else {
        field.to_lowercase()
    };

    QueryBlock::new(Some(field), term)
}

/// Returns true for `scheme://path#fragment` resource identifiers.
pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER.is_match(value)
}

/// Reverses the host's form-safe identifier encoding.
///
/// Property identifiers travel through forms as e.g.
/// `http_2_host_0_org_1_onto_0_rdf_3_prop`.
pub fn decode_identifier(value: &str) -> String {
    value
        .replace("_2_", "://")
        .replace("_0_", ".")
        .replace("_1_", "/")
        .replace("_3_", "#")
        .replace("_4_", ":")
}

/// Byte offset of the first colon not escaped by an odd run of backslashes.
fn first_unescaped_colon(block: &str) -> Option<usize> {
    let mut backslashes = 0usize;
    for (offset, c) in block.char_indices() {
        match c {
            '\\' => backslashes += 1,
            ':' if backslashes % 2 == 0 => return Some(offset),
            _ => backslashes = 0,
        }
    }
    None
}

/// Decodes named and numeric character references. Unknown or malformed
/// references are kept as typed.
fn decode_html_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    ENTITY.replace_all(raw, |caps: &Captures<'_>| {
        let reference = &caps[0];
        unescape(reference).map_or_else(|_| reference.to_string(), Cow::into_owned)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_block_accessors() {
        let block = QueryBlock::new(Some("field".into()), "term");
        assert_eq!(block.field(), Some("field"));
        assert_eq!(block.term(), "term");

        let block = QueryBlock::new(None, "term");
        assert!(block.field().is_none());
    }

    #[test]
    fn test_sanitize_strips_quotes_and_escapes_backslashes() {
        assert_eq!(sanitize(r#"say "hi" it's"#), "say hi its");
        assert_eq!(sanitize(r"a\b"), r"a\\b");
        assert_eq!(sanitize("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(sanitize("&quot;quoted&quot;"), "quoted");
        assert_eq!(sanitize("a &unknown; b"), "a &unknown; b");
    }

    #[test]
    fn test_sanitize_decodes_numeric_references() {
        assert_eq!(sanitize("&#34;x&#34; &#x27;y&#x27; &#039;z&#39;"), "x y z");
        assert_eq!(sanitize("&lt;b&gt; &apos;"), "<b> ");
        assert_eq!(sanitize("fish & chips &"), "fish & chips &");
        assert_eq!(sanitize("&#xZZ;"), "&#xZZ;");
    }

    #[test]
    fn test_split_is_case_insensitive() {
        assert_eq!(split_blocks("a:b AND c:d"), vec!["a:b", "c:d"]);
        assert_eq!(split_blocks("a:b aNd c:d and e"), vec!["a:b", "c:d", "e"]);
        assert_eq!(split_blocks("sandwich"), vec!["sandwich"]);
    }

    #[test]
    fn test_parse_field_and_term() {
        let block = parse_block(" LaBeL : My Item ");
        assert_eq!(block.field(), Some("label"));
        assert_eq!(block.term(), "My Item");
    }

    #[test]
    fn test_parse_without_colon_is_free_text() {
        let block = parse_block("just words");
        assert!(block.field().is_none());
        assert_eq!(block.term(), "just words");

        let block = parse_block(":leading");
        assert!(block.field().is_none());
        assert_eq!(block.term(), "leading");
    }

    #[test]
    fn test_parse_identifier_block_is_atomic() {
        let uri = "http://www.tao.lu/Ontologies/TAOItem.rdf#i123";
        let block = parse_block(uri);
        assert!(block.field().is_none());
        assert_eq!(block.term(), uri);
    }

    #[test]
    fn test_parse_term_keeps_later_colons() {
        let block = parse_block("class:http://host/onto.rdf#Thing");
        assert_eq!(block.field(), Some("class"));
        assert_eq!(block.term(), "http://host/onto.rdf#Thing");
    }

    #[test]
    fn test_encoded_identifier_field_keeps_case() {
        let field = "http_2_host_0_org_1_Onto_0_rdf_3_Color";
        let block = parse_block(&format!("{field}:Red"));
        assert_eq!(block.field(), Some(field));
        assert_eq!(block.term(), "Red");
    }

    #[test]
    fn test_escaped_colon_is_not_a_separator() {
        let block = parse_block(r"a\:b:c");
        assert_eq!(block.field(), Some(r"a\:b"));
        assert_eq!(block.term(), "c");
        // an escaped backslash does not escape the colon that follows it
        let block = parse_block(r"a\\:b");
        assert_eq!(block.field(), Some(r"a\\"));
    }

    #[test]
    fn test_parse_query_end_to_end() {
        let blocks = parse_query("label:test and \"custom field\":x");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], QueryBlock::new(Some("label".into()), "test"));
        assert_eq!(blocks[1], QueryBlock::new(Some("custom field".into()), "x"));
    }
}
