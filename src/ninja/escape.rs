//! Ninja lexical escaping.
//!
//! Grounded on the `ninja-writer` crate's `escape_impl`: a single pass that
//! only allocates when a character actually needs escaping, borrowing the
//! input unchanged otherwise.
//!
//! See <https://ninja-build.org/manual.html#ref_lexer>.

use std::borrow::Cow;

/// Escape a string for use as a general (non-path) Ninja value: `$` and
/// newlines are escaped, spaces and colons are left alone.
#[must_use]
pub fn escape(s: &str) -> Cow<'_, str> {
    escape_impl(s, false, false)
}

/// Escape a string for use as a path: `$`, newlines, and spaces are
/// escaped, since unescaped spaces separate list entries.
#[must_use]
pub fn escape_path(s: &str) -> Cow<'_, str> {
    escape_impl(s, true, false)
}

/// Escape a string for use as a build output or rule reference: `$`,
/// newlines, spaces, and colons are all escaped.
#[must_use]
pub fn escape_build(s: &str) -> Cow<'_, str> {
    escape_impl(s, true, true)
}

fn escape_impl(s: &str, escape_space: bool, escape_colon: bool) -> Cow<'_, str> {
    let mut output: Option<String> = None;
    for (i, c) in s.char_indices() {
        let needs_escape = match c {
            '$' | '\n' => true,
            ' ' => escape_space,
            ':' => escape_colon,
            _ => false,
        };
        match output.as_mut() {
            Some(buf) => {
                if needs_escape {
                    buf.push('$');
                }
                buf.push(c);
            }
            None => {
                if needs_escape {
                    let mut buf = s.get(..i).unwrap_or_default().to_owned();
                    buf.push('$');
                    buf.push(c);
                    output = Some(buf);
                }
            }
        }
    }
    match output {
        Some(buf) => Cow::Owned(buf),
        None => Cow::Borrowed(s),
    }
}

/// Count of `$` characters immediately preceding byte offset `idx` in `s`.
///
/// Used by the word-wrap routine (spec 4.A) to decide whether a space is an
/// eligible break point: a space is unescaped exactly when it is preceded by
/// an even number of consecutive `$` characters.
#[must_use]
pub fn preceding_dollar_run(s: &str, idx: usize) -> usize {
    s.get(..idx)
        .unwrap_or_default()
        .chars()
        .rev()
        .take_while(|c| *c == '$')
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_leaves_plain_text_unchanged() {
        assert_eq!(escape("foo"), "foo");
        assert_eq!(escape_path("foo"), "foo");
        assert_eq!(escape_build("foo"), "foo");
    }

    #[test]
    fn escape_dollar() {
        assert_eq!(escape("$foo"), "$$foo");
    }

    #[test]
    fn escape_path_escapes_space_not_colon() {
        assert_eq!(escape_path("foo bar"), "foo$ bar");
        assert_eq!(escape_path("foo: bar"), "foo:$ bar");
    }

    #[test]
    fn escape_build_escapes_space_and_colon() {
        assert_eq!(escape_build("foo bar"), "foo$ bar");
        assert_eq!(escape_build("foo: bar"), "foo$:$ bar");
    }

    #[test]
    fn escape_newline() {
        assert_eq!(escape("foo\nbar"), "foo$\nbar");
    }

    #[test]
    fn preceding_dollar_run_counts_consecutive_dollars() {
        assert_eq!(preceding_dollar_run("a$$ b", 3), 2);
        assert_eq!(preceding_dollar_run("a b", 2), 0);
        assert_eq!(preceding_dollar_run("a$ b", 2), 1);
    }

    #[test]
    fn round_trips_through_escape_and_parse() {
        let candidates = [
            "plain",
            "weird file:name.o",
            "src/weird space.c",
            "$already$escaped",
            "a:b c",
        ];
        for candidate in candidates {
            let escaped = escape_build(candidate);
            assert_eq!(naive_unescape(&escaped), candidate);
        }
    }

    /// Minimal unescaper mirroring Ninja's lexer, used only to validate the
    /// round-trip property in tests.
    fn naive_unescape(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '$' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(c);
            }
        }
        out
    }
}
