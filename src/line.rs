//! Order-tolerant splitting of a raw dump line into identity and secret.
//!
//! Dumps mostly look like `user@host:secret`, but the delimiter varies
//! (`:`, `;`, `,` or `~~~`) and some files put the secret first. Each shape
//! has its own matcher so it can be exercised on its own; [`split_line`]
//! tries forward first and falls back to backward.
use std::sync::LazyLock;

use regex::Regex;

// Local-part and domain tokens: ASCII word chars, '.', '-' and ASCII whitespace.
const IDENTITY: &str = r"[A-Za-z0-9_.\-\t\n\x0C\r ]+@[A-Za-z0-9_.\-\t\n\x0C\r ]+";
const DELIMITER: &str = r"(?:[:;,]|~{3})";

static FORWARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^({IDENTITY}){DELIMITER}(.+)$")).expect("forward pattern compiles")
});

static BACKWARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(.+){DELIMITER}({IDENTITY})$")).expect("backward pattern compiles")
});

/// Outcome of classifying a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMatch<'a> {
    /// `identity<delim>secret`
    Forward { identity: &'a str, secret: &'a str },
    /// `secret<delim>identity`
    Backward { identity: &'a str, secret: &'a str },
    NoMatch,
}

impl<'a> LineMatch<'a> {
    /// `(identity, secret)` for either matched shape.
    pub fn parts(&self) -> Option<(&'a str, &'a str)> {
        match *self {
            LineMatch::Forward { identity, secret } | LineMatch::Backward { identity, secret } => {
                Some((identity, secret))
            }
            LineMatch::NoMatch => None,
        }
    }
}

/// Match `identity<delim>secret`. The secret is everything after the
/// delimiter, untrimmed.
pub fn match_forward(line: &str) -> Option<(&str, &str)> {
    let caps = FORWARD.captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Match `secret<delim>identity`, identity anchored at the end of the line.
/// The secret side is greedy: the last delimiter that still leaves a valid
/// identity on its right wins.
pub fn match_backward(line: &str) -> Option<(&str, &str)> {
    let caps = BACKWARD.captures(line)?;
    Some((caps.get(2)?.as_str(), caps.get(1)?.as_str()))
}

pub fn split_line(line: &str) -> LineMatch<'_> {
    if let Some((identity, secret)) = match_forward(line) {
        return LineMatch::Forward { identity, secret };
    }
    if let Some((identity, secret)) = match_backward(line) {
        return LineMatch::Backward { identity, secret };
    }
    LineMatch::NoMatch
}
