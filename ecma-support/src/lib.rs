use std::borrow::Cow;
use std::fmt;

/// Escape `quote`, backslashes and line terminators so `input` can be placed
/// back between a pair of `quote` characters.
pub fn escape_string_contents(input: &str, quote: char) -> Cow<'_, str> {
    let needs_escape = input
        .chars()
        .any(|ch| ch == quote || matches!(ch, '\\' | '\n' | '\r' | '\t'));
    if !needs_escape {
        return Cow::Borrowed(input);
    }

    let mut escaped = String::with_capacity(input.len() + 4);
    for ch in input.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other if other == quote => {
                escaped.push('\\');
                escaped.push(other);
            }
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

fn escape_single_quotes(input: &str) -> Cow<'_, str> {
    if input.contains('\'') {
        Cow::Owned(input.replace('\'', "\\'"))
    } else {
        Cow::Borrowed(input)
    }
}

fn format_operation_error(
    module: &str,
    operation: &str,
    target: Option<&str>,
    error: impl fmt::Display,
) -> String {
    match target {
        Some(target) => {
            let escaped = escape_single_quotes(target);
            format!("{module}.{operation}('{}') failed: {error}", escaped)
        }
        None => format!("{module}.{operation} failed: {error}"),
    }
}

pub fn registry_error(operation: &str, target: Option<&str>, error: impl fmt::Display) -> String {
    format_operation_error("registry", operation, target, error)
}

pub fn cli_error(operation: &str, error: impl fmt::Display) -> String {
    format_operation_error("cli", operation, None, error)
}

pub fn cli_target_error(operation: &str, target: &str, error: impl fmt::Display) -> String {
    format_operation_error("cli", operation, Some(target), error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_plain_strings_borrowed() {
        assert!(matches!(
            escape_string_contents("hello", '"'),
            Cow::Borrowed("hello")
        ));
    }

    #[test]
    fn escapes_only_the_active_quote() {
        assert_eq!(escape_string_contents("it's \"x\"", '\''), "it\\'s \"x\"");
        assert_eq!(escape_string_contents("it's \"x\"", '"'), "it's \\\"x\\\"");
        assert_eq!(escape_string_contents("a\nb", '"'), "a\\nb");
    }

    #[test]
    fn formats_targeted_errors() {
        assert_eq!(
            cli_target_error("read", "it's.js", "missing"),
            "cli.read('it\\'s.js') failed: missing"
        );
        assert_eq!(
            registry_error("load", None, "bad json"),
            "registry.load failed: bad json"
        );
    }
}
