use thiserror::Error;

/// Reasons a line of text cannot be split into arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(&'static str),

    #[error("trailing backslash")]
    TrailingEscape,
}

/// Shell-like argument splitting for message text.
///
/// Handles:
/// - Whitespace-separated arguments
/// - Quoted strings (single and double quotes), which may be empty
/// - Backslash escapes outside quotes and inside double quotes
///
/// Unbalanced quotes and a dangling backslash are errors rather than guesses.
pub fn shell_split(input: &str) -> Result<Vec<String>, SplitError> {
    let mut args = Vec::new();
    let mut current = String::new();
    // A quoted empty string still counts as an argument.
    let mut in_word = false;
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if !in_single_quote => {
                escape_next = true;
                in_word = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                in_word = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                in_word = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            _ => {
                current.push(ch);
                in_word = true;
            }
        }
    }

    if escape_next {
        return Err(SplitError::TrailingEscape);
    }
    if in_single_quote {
        return Err(SplitError::UnterminatedQuote("single"));
    }
    if in_double_quote {
        return Err(SplitError::UnterminatedQuote("double"));
    }

    if in_word {
        args.push(current);
    }

    Ok(args)
}

/// Quotes `arg`, if needed, so that [`shell_split`] reads it back as one
/// argument.
pub fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && !arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\'));
    if plain {
        return arg.to_string();
    }

    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for ch in arg.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_split_simple() {
        let args = shell_split("echo hello world").unwrap();
        assert_eq!(args, vec!["echo", "hello", "world"]);
    }

    #[test]
    fn test_shell_split_quoted() {
        let args = shell_split(r#"echo "hello world" test"#).unwrap();
        assert_eq!(args, vec!["echo", "hello world", "test"]);
    }

    #[test]
    fn test_shell_split_single_quoted() {
        let args = shell_split("echo 'hello world' test").unwrap();
        assert_eq!(args, vec!["echo", "hello world", "test"]);
    }

    #[test]
    fn test_shell_split_mixed_quotes() {
        let args = shell_split(r#"cmd "double's quote" 'single"s quote'"#).unwrap();
        assert_eq!(args, vec!["cmd", "double's quote", r#"single"s quote"#]);
    }

    #[test]
    fn test_shell_split_escapes() {
        let args = shell_split(r#"say \"hi\" "a \"b\"" one\ word"#).unwrap();
        assert_eq!(args, vec!["say", r#""hi""#, r#"a "b""#, "one word"]);
    }

    #[test]
    fn test_shell_split_empty_quotes_are_arguments() {
        let args = shell_split(r#"set key """#).unwrap();
        assert_eq!(args, vec!["set", "key", ""]);
    }

    #[test]
    fn test_shell_split_empty() {
        assert!(shell_split("").unwrap().is_empty());
        assert!(shell_split("   \t \n ").unwrap().is_empty());
    }

    #[test]
    fn test_shell_split_unbalanced() {
        assert_eq!(
            shell_split(r#"echo "oops"#),
            Err(SplitError::UnterminatedQuote("double"))
        );
        assert_eq!(
            shell_split("echo 'oops"),
            Err(SplitError::UnterminatedQuote("single"))
        );
        assert_eq!(shell_split("echo \\"), Err(SplitError::TrailingEscape));
    }

    #[test]
    fn test_quote_only_when_needed() {
        assert_eq!(quote("ping"), "ping");
        assert_eq!(quote("two words"), r#""two words""#);
        assert_eq!(quote(""), r#""""#);
    }

    #[test]
    fn test_quote_round_trips() {
        for arg in ["plain", "two words", r#"has "quotes""#, r"back\slash", "it's", ""] {
            let line = format!("x {}", quote(arg));
            assert_eq!(shell_split(&line).unwrap(), vec!["x", arg]);
        }
    }
}
