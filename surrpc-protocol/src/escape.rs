//! Quoting rules for SurrealQL literals.
//!
//! Each function decides between passing the input through unchanged and
//! wrapping it in a delimiter pair, based on the character classes present.

const BRACKET_L: &str = "⟨";
const BRACKET_R: &str = "⟩";
const BRACKET_ESC: &str = "\\⟩";
const BACKTICK: &str = "`";
const BACKTICK_ESC: &str = "\\`";
const SINGLE_QUOTE: &str = "'";
const DOUBLE_QUOTE: &str = "\"";
const DOUBLE_QUOTE_ESC: &str = "\\\"";

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn wrap(s: &str, left: &str, right: &str, escaped: &str) -> String {
    let mut out = String::with_capacity(s.len() + left.len() + right.len());
    out.push_str(left);
    out.push_str(&s.replace(right, escaped));
    out.push_str(right);
    out
}

/// Wraps unless the input is a word that does not start with a digit.
fn escape_starts_numeric(s: &str, left: &str, right: &str, escaped: &str) -> String {
    let starts_with_digit = s.chars().next().is_some_and(|c| c.is_ascii_digit());
    if starts_with_digit || !s.chars().all(is_word_char) {
        wrap(s, left, right, escaped)
    } else {
        s.to_string()
    }
}

/// Wraps if the input is all digits or contains a non-word character.
fn escape_full_numeric(s: &str, left: &str, right: &str, escaped: &str) -> String {
    if !s.chars().all(is_word_char) || s.chars().all(|c| c.is_ascii_digit()) {
        wrap(s, left, right, escaped)
    } else {
        s.to_string()
    }
}

/// Formats a string literal, preferring single quotes.
pub fn quote_str(s: &str) -> String {
    if s.is_empty() {
        return format!("{SINGLE_QUOTE}{SINGLE_QUOTE}");
    }

    let s = s.replace('\\', "\\\\");
    if !s.contains(SINGLE_QUOTE) {
        return format!("{SINGLE_QUOTE}{s}{SINGLE_QUOTE}");
    }

    wrap(&s, DOUBLE_QUOTE, DOUBLE_QUOTE, DOUBLE_QUOTE_ESC)
}

/// Formats an object key.
pub fn quote_key(key: &str) -> String {
    if key.is_empty() {
        return format!("{DOUBLE_QUOTE}{DOUBLE_QUOTE}");
    }
    escape_starts_numeric(key, DOUBLE_QUOTE, DOUBLE_QUOTE, DOUBLE_QUOTE_ESC)
}

/// Formats an identifier such as a table name.
pub fn quote_ident(ident: &str) -> String {
    if ident.is_empty() {
        return format!("{BACKTICK}{BACKTICK}");
    }
    escape_starts_numeric(ident, BACKTICK, BACKTICK, BACKTICK_ESC)
}

/// Formats one component of a record id.
pub fn quote_rid(rid: &str) -> String {
    if rid.is_empty() {
        return format!("{BRACKET_L}{BRACKET_R}");
    }
    escape_full_numeric(rid, BRACKET_L, BRACKET_R, BRACKET_ESC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_forms() {
        assert_eq!(quote_str(""), "''");
        assert_eq!(quote_key(""), "\"\"");
        assert_eq!(quote_ident(""), "``");
        assert_eq!(quote_rid(""), "⟨⟩");
    }

    #[test]
    fn test_quote_str() {
        assert_eq!(quote_str("hello"), "'hello'");
        assert_eq!(quote_str("a\\b"), "'a\\\\b'");
        assert_eq!(quote_str("it's"), "\"it's\"");
        assert_eq!(quote_str("it's \"x\""), "\"it's \\\"x\\\"\"");
        // Double quotes alone do not force the double-quoted form.
        assert_eq!(quote_str("say \"hi\""), "'say \"hi\"'");
    }

    #[test]
    fn test_quote_key() {
        assert_eq!(quote_key("name"), "name");
        assert_eq!(quote_key("_id2"), "_id2");
        assert_eq!(quote_key("2nd"), "\"2nd\"");
        assert_eq!(quote_key("first name"), "\"first name\"");
        assert_eq!(quote_key("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("user"), "user");
        assert_eq!(quote_ident("tai-kun"), "`tai-kun`");
        assert_eq!(quote_ident("1table"), "`1table`");
        assert_eq!(quote_ident("a`b"), "`a\\`b`");
        assert_eq!(quote_ident("ユーザー"), "`ユーザー`");
    }

    #[test]
    fn test_quote_rid() {
        assert_eq!(quote_rid("123"), "⟨123⟩");
        assert_eq!(quote_rid("tai-kun"), "⟨tai-kun⟩");
        assert_eq!(quote_rid("user"), "user");
        // Leading digits are fine as long as the whole thing is not numeric.
        assert_eq!(quote_rid("1abc"), "1abc");
        assert_eq!(quote_rid("a⟩b"), "⟨a\\⟩b⟩");
    }

    proptest! {
        #[test]
        fn prop_word_identifiers_pass_through(s in "[a-zA-Z_][a-zA-Z0-9_]{0,16}") {
            prop_assert_eq!(quote_ident(&s), s.clone());
            prop_assert_eq!(quote_key(&s), s);
        }

        #[test]
        fn prop_numeric_rids_are_bracketed(s in "[0-9]{1,12}") {
            prop_assert_eq!(quote_rid(&s), format!("⟨{}⟩", s));
        }

        #[test]
        fn prop_quote_str_is_delimited(s in ".{1,24}") {
            let quoted = quote_str(&s);
            let first = quoted.chars().next().unwrap();
            let last = quoted.chars().last().unwrap();
            prop_assert!(first == '\'' || first == '"');
            prop_assert_eq!(first, last);
        }
    }
}
