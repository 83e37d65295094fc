//! Command representation
//!
//! One input line is `<toupper|tolower> <N> <token_1> ... <token_N>`. Parsing
//! produces a [`CommandLine`] borrowing from that line; executing it joins the
//! tokens and maps every character through the selected [`Transform`].

use crate::error::CommandParseError;

/// Per-byte case mapping selected by the first token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// `toupper`
    Uppercase,
    /// `tolower`
    Lowercase,
}

impl Transform {
    /// Look up a transform by its command name
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"toupper" => Some(Transform::Uppercase),
            b"tolower" => Some(Transform::Lowercase),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transform::Uppercase => "toupper",
            Transform::Lowercase => "tolower",
        }
    }

    /// Map a single byte. Only ASCII letters change; every other byte,
    /// including ones that are not valid UTF-8, passes through.
    pub fn apply_byte(&self, b: u8) -> u8 {
        match self {
            Transform::Uppercase => b.to_ascii_uppercase(),
            Transform::Lowercase => b.to_ascii_lowercase(),
        }
    }

    pub fn apply(&self, text: &[u8]) -> Vec<u8> {
        text.iter().map(|&b| self.apply_byte(b)).collect()
    }
}

/// A parsed command, valid for one loop iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub transform: Transform,
    pub tokens: Vec<&'a [u8]>,
}

impl<'a> CommandLine<'a> {
    /// Parse one line (without its trailing newline).
    ///
    /// Tokens are separated by single spaces; runs of spaces yield no empty
    /// tokens. Tokens beyond the announced count are ignored. The line is
    /// raw input and need not be UTF-8.
    pub fn parse(line: &'a [u8]) -> Result<Self, CommandParseError> {
        let mut words = line.split(|&b| b == b' ').filter(|word| !word.is_empty());

        let name = words.next().unwrap_or_default();
        let transform = Transform::from_name(name)
            .ok_or_else(|| CommandParseError::UnknownTransform(lossy(name)))?;

        let count_word = words.next().unwrap_or_default();
        let count = parse_count(count_word)?;

        let tokens: Vec<&[u8]> = words.take(count).collect();
        if tokens.len() < count {
            return Err(CommandParseError::MissingTokens {
                expected: count,
                found: tokens.len(),
            });
        }

        Ok(Self { transform, tokens })
    }

    /// Repeat count announced on the line
    pub fn count(&self) -> usize {
        self.tokens.len()
    }

    /// Join the tokens and apply the transform
    pub fn execute(&self) -> Vec<u8> {
        self.transform.apply(&join_tokens(&self.tokens))
    }
}

fn lossy(word: &[u8]) -> String {
    String::from_utf8_lossy(word).into_owned()
}

/// Base-10 count, at least 1, nothing trailing
fn parse_count(word: &[u8]) -> Result<usize, CommandParseError> {
    let parsed = std::str::from_utf8(word).ok().and_then(|w| w.parse::<usize>().ok());
    match parsed {
        Some(n) if n >= 1 => Ok(n),
        _ => Err(CommandParseError::InvalidCount(lossy(word))),
    }
}

/// Concatenate tokens, inserting a space before a token only when the output
/// accumulated so far is longer than one byte.
///
/// A one-byte first token is therefore glued to the second one:
/// `["a", "bc"]` joins to `"abc"` while `["ab", "c"]` joins to `"ab c"`.
pub fn join_tokens<T: AsRef<[u8]>>(tokens: &[T]) -> Vec<u8> {
    let mut out = Vec::new();
    for token in tokens {
        if out.len() > 1 {
            out.push(b' ');
        }
        out.extend_from_slice(token.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(line: &str) -> Result<String, CommandParseError> {
        CommandLine::parse(line.as_bytes()).map(|cmd| String::from_utf8(cmd.execute()).unwrap())
    }

    #[test]
    fn test_toupper_three_tokens() {
        assert_eq!(run("toupper 3 foo bar baz").unwrap(), "FOO BAR BAZ");
    }

    #[test]
    fn test_single_char_first_token_is_glued() {
        assert_eq!(run("toupper 2 a bc").unwrap(), "ABC");
        // once the output passes one byte, separators come back
        assert_eq!(run("toupper 3 a b c").unwrap(), "AB C");
        assert_eq!(run("tolower 3 X Y Z").unwrap(), "xy z");
    }

    #[test]
    fn test_tolower_single_token() {
        assert_eq!(run("tolower 1 HELLO").unwrap(), "hello");
    }

    #[test]
    fn test_unknown_transform() {
        assert_eq!(
            run("foo 2 a b"),
            Err(CommandParseError::UnknownTransform("foo".to_string()))
        );
        assert_eq!(
            run(""),
            Err(CommandParseError::UnknownTransform(String::new()))
        );
    }

    #[test]
    fn test_invalid_counts() {
        for line in ["toupper 0 a", "toupper -1 a", "toupper 2x a b", "toupper", "toupper two a b"] {
            assert!(
                matches!(run(line), Err(CommandParseError::InvalidCount(_))),
                "expected InvalidCount for {:?}",
                line
            );
        }
    }

    #[test]
    fn test_missing_tokens() {
        assert_eq!(
            run("toupper 3 a b"),
            Err(CommandParseError::MissingTokens {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn test_extra_tokens_are_ignored() {
        let cmd = CommandLine::parse(b"toupper 1 keep drop").unwrap();
        assert_eq!(cmd.tokens, vec![&b"keep"[..]]);
        assert_eq!(cmd.count(), 1);
        assert_eq!(cmd.execute(), b"KEEP");
    }

    #[test]
    fn test_repeated_spaces_do_not_make_tokens() {
        assert_eq!(run("toupper  2  ab   cd").unwrap(), "AB CD");
    }

    #[test]
    fn test_transform_leaves_non_ascii_alone() {
        assert_eq!(Transform::Uppercase.apply("straße-9".as_bytes()), "STRAßE-9".as_bytes());
        assert_eq!(Transform::from_name(b"toupper").unwrap().name(), "toupper");
        assert_eq!(Transform::from_name(b"TOUPPER"), None);
    }

    #[test]
    fn test_invalid_utf8_bytes_pass_through() {
        let cmd = CommandLine::parse(b"toupper 2 ab\xffcd \xfe").unwrap();
        assert_eq!(cmd.execute(), b"AB\xffCD \xfe");
        assert_eq!(
            Transform::Lowercase.apply(b"\x80Z\xc3"),
            b"\x80z\xc3".to_vec()
        );

        // a mangled name is still rejected, with a readable diagnostic
        assert_eq!(
            CommandLine::parse(b"to\xffupper 1 a"),
            Err(CommandParseError::UnknownTransform("to\u{fffd}upper".to_string()))
        );
        assert!(matches!(
            CommandLine::parse(b"toupper \xff a"),
            Err(CommandParseError::InvalidCount(_))
        ));
    }

    #[test]
    fn test_join_tokens_edges() {
        assert_eq!(join_tokens::<&str>(&[]), b"");
        assert_eq!(join_tokens(&["ab", "c"]), b"ab c");
        assert_eq!(join_tokens(&["", "a", "b"]), b"ab");
    }
}
