//! Painless script templates for in-place document mutation.
//!
//! Every name and value is emitted as a single-quoted literal through
//! [`quote_literal`], so no input can terminate the literal early.

/// Quotes `value` as a single-quoted script string literal.
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

/// `ctx._source['to'] = ctx._source['from'];`
pub fn copy_field(from: &str, to: &str) -> String {
    format!(
        "ctx._source[{}] = ctx._source[{}];",
        quote_literal(to),
        quote_literal(from)
    )
}

/// `ctx._source.remove('name');`
pub fn remove_field(name: &str) -> String {
    format!("ctx._source.remove({});", quote_literal(name))
}

/// `ctx._source['name'] = ['v1', 'v2'];`
pub fn assign_values<S: AsRef<str>>(name: &str, values: &[S]) -> String {
    let values: Vec<String> = values.iter().map(|v| quote_literal(v.as_ref())).collect();
    format!(
        "ctx._source[{}] = [{}];",
        quote_literal(name),
        values.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_and_remove() {
        assert_eq!(
            copy_field("old", "new"),
            "ctx._source['new'] = ctx._source['old'];"
        );
        assert_eq!(remove_field("old"), "ctx._source.remove('old');");
    }

    #[test]
    fn test_assign_values() {
        assert_eq!(
            assign_values("p", &["v1", "v2"]),
            "ctx._source['p'] = ['v1', 'v2'];"
        );
        let empty: [&str; 0] = [];
        assert_eq!(assign_values("p", &empty), "ctx._source['p'] = [];");
    }

    #[test]
    fn test_literals_are_escaped() {
        assert_eq!(quote_literal("it's"), r"'it\'s'");
        assert_eq!(quote_literal(r"a\b"), r"'a\\b'");
        assert_eq!(
            remove_field("x'); ctx._source.clear(); ('"),
            r"ctx._source.remove('x\'); ctx._source.clear(); (\'');"
        );
    }
}
