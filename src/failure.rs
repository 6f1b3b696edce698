//! Error types: per-line failures collected during a run, and the hard
//! failures that abort one.
//!
//! Per-line failures never stop a scan. They are gathered, in the order they
//! occur, into a single [`ParseFailures`] value that is returned next to the
//! parsed records and can be taken apart again entry by entry.
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Why a line did not contribute a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, thiserror::Error)]
pub enum FailureReason {
    #[error("failed to parse credentials")]
    Unparseable,
    #[error("duplicate line; already processed")]
    Duplicate,
    #[error("could not determine identity fields")]
    MissingIdentityFields,
}

/// One failed input line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} [{raw}] at line [{line_number}]")]
pub struct LineFailure {
    /// 1-based position in the input stream.
    pub line_number: usize,
    pub raw: String,
    pub reason: FailureReason,
}

/// Ordered collection of every per-line failure in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseFailures {
    entries: Vec<LineFailure>,
}

impl ParseFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line_number: usize, raw: &str, reason: FailureReason) {
        log::debug!("line {}: {}", line_number, reason);
        self.entries.push(LineFailure {
            line_number,
            raw: raw.to_string(),
            reason,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineFailure> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[LineFailure] {
        &self.entries
    }

    pub fn count_of(&self, reason: FailureReason) -> usize {
        self.entries.iter().filter(|f| f.reason == reason).count()
    }
}

impl fmt::Display for ParseFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseFailures {}

impl IntoIterator for ParseFailures {
    type Item = LineFailure;
    type IntoIter = std::vec::IntoIter<LineFailure>;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParseFailures {
    type Item = &'a LineFailure;
    type IntoIter = std::slice::Iter<'a, LineFailure>;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<LineFailure> for ParseFailures {
    fn from_iter<T: IntoIterator<Item = LineFailure>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Failures that stop a run before a result can be produced.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to open credentials file {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to map credentials file {}: {source}", .path.display())]
    Map { path: PathBuf, source: io::Error },

    #[error("failed reading input at line [{line_number}]: {source}")]
    Read { line_number: usize, source: io::Error },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_one_failure_per_line() {
        let mut f = ParseFailures::new();
        f.push(1, "junk", FailureReason::Unparseable);
        f.push(4, "a@b.com:pw", FailureReason::Duplicate);
        assert_eq!(
            f.to_string(),
            "failed to parse credentials [junk] at line [1]\n\
             duplicate line; already processed [a@b.com:pw] at line [4]"
        );
    }

    #[test]
    fn entries_can_be_taken_apart() {
        let mut f = ParseFailures::new();
        f.push(2, "x", FailureReason::MissingIdentityFields);
        f.push(3, "y", FailureReason::Unparseable);
        assert_eq!(f.count_of(FailureReason::Unparseable), 1);
        let lines: Vec<usize> = f.iter().map(|e| e.line_number).collect();
        assert_eq!(lines, vec![2, 3]);
        let owned: Vec<LineFailure> = f.into_iter().collect();
        assert_eq!(owned[0].raw, "x");
        assert_eq!(owned[0].reason, FailureReason::MissingIdentityFields);
    }

    #[test]
    fn single_entry_renders_reason_and_context() {
        let entry = LineFailure {
            line_number: 7,
            raw: "???".to_string(),
            reason: FailureReason::MissingIdentityFields,
        };
        insta::assert_snapshot!(entry.to_string(), @"could not determine identity fields [???] at line [7]");
    }
}
