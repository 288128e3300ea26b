//! Shell-style wildcard matching for usernames.
//!
//! Supported syntax:
//! - `*` matches any run of characters (including none)
//! - `?` matches exactly one character
//! - `[seq]` matches one character in `seq`; ranges such as `a-z` are allowed
//! - `[!seq]` matches one character not in `seq`
//!
//! Everything else matches literally. An unterminated `[` is taken literally.
//! Patterns are compiled once into an anchored [`Regex`].

use regex::Regex;
use thiserror::Error;

/// A pattern that cannot be compiled.
#[derive(Debug, Error)]
#[error("invalid wildcard pattern {pattern:?}: {source}")]
pub struct PatternError {
    pattern: String,
    #[source]
    source: regex::Error,
}

/// A compiled wildcard pattern.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    raw: String,
    regex: Regex,
}

impl WildcardPattern {
    /// Compiles a wildcard pattern.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(&translate(pattern)).map_err(|source| PatternError {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    /// Returns true if the whole of `candidate` matches the pattern.
    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// Returns the pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Translates a wildcard pattern into an anchored regular expression.
fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 8);
    out.push_str("(?s)^");

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                // Consecutive stars collapse into one.
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push_str(&translate_class(&chars[i..end]));
                    i = end + 1;
                }
                None => out.push_str("\\["),
            },
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }

    out.push('$');
    out
}

/// Finds the index of the `]` closing a class whose body starts at `start`.
///
/// A `]` directly after the opening bracket (or after `!`) is part of the set.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start;
    if j < chars.len() && chars[j] == '!' {
        j += 1;
    }
    if j < chars.len() && chars[j] == ']' {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}

fn translate_class(body: &[char]) -> String {
    let mut out = String::from("[");
    let mut rest = body;
    if let Some(('!', tail)) = rest.split_first() {
        out.push('^');
        rest = tail;
    }
    for &c in rest {
        match c {
            // `-` keeps its range meaning; anything the regex class syntax
            // treats specially is escaped.
            '\\' | '[' | ']' | '^' | '&' | '~' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(pattern: &str, candidate: &str) -> bool {
        WildcardPattern::new(pattern).unwrap().matches(candidate)
    }

    #[test]
    fn star_matches_prefix() {
        assert!(m("user*", "user1"));
        assert!(m("user*", "user"));
        assert!(!m("user*", "admin"));
        assert!(!m("a*", "user1"));
    }

    #[test]
    fn star_alone_matches_everything() {
        assert!(m("*", ""));
        assert!(m("*", "anything at all"));
        assert!(m("**", "x"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(m("user?", "user1"));
        assert!(!m("user?", "user"));
        assert!(!m("user?", "user12"));
    }

    #[test]
    fn match_is_anchored() {
        assert!(!m("ser", "user"));
        assert!(m("*ser", "user"));
    }

    #[test]
    fn literal_regex_metacharacters() {
        assert!(m("a.b", "a.b"));
        assert!(!m("a.b", "axb"));
        assert!(m("(x)+", "(x)+"));
        assert!(m("$^", "$^"));
    }

    #[test]
    fn character_classes() {
        assert!(m("user[12]", "user1"));
        assert!(m("user[12]", "user2"));
        assert!(!m("user[12]", "user3"));
        assert!(m("user[0-9]", "user7"));
        assert!(m("user[!0-9]", "userx"));
        assert!(!m("user[!0-9]", "user7"));
    }

    #[test]
    fn bracket_first_in_class_is_literal() {
        assert!(m("[]]", "]"));
        assert!(m("[!]]", "a"));
        assert!(!m("[!]]", "]"));
    }

    #[test]
    fn unterminated_class_is_literal() {
        assert!(m("user[", "user["));
        assert!(!m("user[", "user1"));
    }

    #[test]
    fn reversed_range_is_invalid() {
        let err = WildcardPattern::new("[z-a]").unwrap_err();
        assert!(err.to_string().starts_with("invalid wildcard pattern \"[z-a]\""));
    }

    #[test]
    fn unicode_candidates() {
        assert!(m("h?llo", "hällo"));
        assert!(m("*ü*", "grüß"));
    }

    #[test]
    fn pattern_keeps_source() {
        let p = WildcardPattern::new("user*").unwrap();
        assert_eq!(p.as_str(), "user*");
    }
}
