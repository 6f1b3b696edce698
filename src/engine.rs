//! Engine: runs the per-line pipeline (dedup ledger, line splitting, identity
//! decomposition, accumulation) over one line source, and orchestrates one
//! independent run per input file.
//!
//! Typical usage:
//!
//! ```no_run
//! use credsift::engine::Engine;
//! # fn main() -> anyhow::Result<()> {
//! let mut engine = Engine::new();
//! engine.load_from_file_paths(&["/path/to/dump.txt"])?;
//! println!("{}", credsift::report::render_summary(&engine));
//! # Ok(())
//! # }
//! ```
use std::collections::{BTreeMap, HashSet};
use std::io::{self, BufRead};
use std::path::Path;

use rayon::prelude::*;

use crate::credential::CredentialRecord;
use crate::failure::{FailureReason, IngestError, ParseFailures};
use crate::io::{DEFAULT_MMAP_THRESHOLD_BYTES, iter_lines_auto, iter_lines_reader};
use crate::line::split_line;

/// Records and failures produced by one parse run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Keyed by full identity; sorted iteration keeps output stable.
    pub records: BTreeMap<String, CredentialRecord>,
    pub failures: ParseFailures,
    pub lines_read: usize,
}

impl RunResult {
    /// The composite per-line error, if any line failed.
    pub fn error(&self) -> Option<&ParseFailures> {
        if self.failures.is_empty() {
            None
        } else {
            Some(&self.failures)
        }
    }

    pub fn into_parts(self) -> (BTreeMap<String, CredentialRecord>, Option<ParseFailures>) {
        let err = if self.failures.is_empty() {
            None
        } else {
            Some(self.failures)
        };
        (self.records, err)
    }
}

/// Per-run state: the identity-keyed records and the ledger of raw lines
/// already seen. Never shared between runs.
#[derive(Debug, Default)]
pub struct Accumulator {
    records: BTreeMap<String, CredentialRecord>,
    // Raw bytes, so lines differing only in invalid UTF-8 stay distinct.
    seen: HashSet<Vec<u8>>,
    failures: ParseFailures,
    lines_read: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the full pipeline for one raw line. Invalid UTF-8 is replaced
    /// with U+FFFD for matching and reporting only.
    pub fn push_line(&mut self, line_number: usize, raw: &[u8]) {
        self.lines_read += 1;
        let text = String::from_utf8_lossy(raw);
        let Some((identity, secret)) = split_line(&text).parts() else {
            // The ledger is consulted before the line shape, so a repeated
            // junk line is reported as a duplicate.
            let reason = if self.seen.insert(raw.to_vec()) {
                FailureReason::Unparseable
            } else {
                FailureReason::Duplicate
            };
            self.failures.push(line_number, &text, reason);
            return;
        };
        self.record(line_number, raw, identity, secret);
    }

    /// Fold an already-split line into the run.
    pub fn record(&mut self, line_number: usize, raw: &[u8], identity: &str, secret: &str) {
        if !self.seen.insert(raw.to_vec()) {
            self.failures
                .push(line_number, &String::from_utf8_lossy(raw), FailureReason::Duplicate);
            return;
        }
        if let Some(existing) = self.records.get_mut(identity) {
            existing.push_secret(secret);
            return;
        }
        match CredentialRecord::new(identity, secret) {
            Some(rec) => {
                self.records.insert(identity.to_string(), rec);
            }
            None => self.failures.push(
                line_number,
                &String::from_utf8_lossy(raw),
                FailureReason::MissingIdentityFields,
            ),
        }
    }

    pub fn finish(self) -> RunResult {
        RunResult {
            records: self.records,
            failures: self.failures,
            lines_read: self.lines_read,
        }
    }
}

/// Parse a stream of lines. Per-line problems are collected in the result; a
/// read error aborts the run with [`IngestError::Read`].
pub fn parse_lines<I, S>(lines: I) -> Result<RunResult, IngestError>
where
    I: IntoIterator<Item = io::Result<S>>,
    S: AsRef<[u8]>,
{
    let mut acc = Accumulator::new();
    for (idx, line) in lines.into_iter().enumerate() {
        let line_number = idx + 1;
        let line = line.map_err(|source| IngestError::Read {
            line_number,
            source,
        })?;
        acc.push_line(line_number, line.as_ref());
    }
    Ok(acc.finish())
}

pub fn parse_reader<R: BufRead>(reader: R) -> Result<RunResult, IngestError> {
    parse_lines(iter_lines_reader(reader))
}

/// In-memory convenience over the same line splitting as [`parse_reader`].
/// Reading from a byte slice cannot fail.
pub fn parse_str(contents: &str) -> RunResult {
    let mut acc = Accumulator::new();
    for (idx, line) in iter_lines_reader(contents.as_bytes()).flatten().enumerate() {
        acc.push_line(idx + 1, &line);
    }
    acc.finish()
}

pub fn parse_file<P: AsRef<Path>>(path: P, mmap_threshold_bytes: u64) -> Result<RunResult, IngestError> {
    let path = path.as_ref();
    let result = parse_lines(iter_lines_auto(path, mmap_threshold_bytes)?)?;
    log::info!(
        "parsed {}: {} lines, {} records, {} failed lines",
        path.display(),
        result.lines_read,
        result.records.len(),
        result.failures.len()
    );
    Ok(result)
}

/// Result of parsing one input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRun {
    pub source: String,
    pub result: RunResult,
}

/// Holds one independent run per loaded source, in load order.
#[derive(Debug, Default)]
pub struct Engine {
    pub runs: Vec<SourceRun>,
}

impl Engine {
    pub fn new() -> Self {
        Self { runs: Vec::new() }
    }

    /// Load inputs already in memory. Sources are named `input-N`.
    pub fn load_from_strings(&mut self, inputs: &[&str]) {
        for (i, contents) in inputs.iter().enumerate() {
            self.runs.push(SourceRun {
                source: format!("input-{}", i + 1),
                result: parse_str(contents),
            });
        }
    }

    /// Stream each file in turn. The first unreadable file aborts the load;
    /// runs already completed stay loaded.
    pub fn load_from_file_paths_with_threshold<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        mmap_threshold_bytes: u64,
    ) -> Result<(), IngestError> {
        for p in paths {
            let result = parse_file(p, mmap_threshold_bytes)?;
            self.runs.push(SourceRun {
                source: p.as_ref().display().to_string(),
                result,
            });
        }
        Ok(())
    }

    /// Parse every file on the rayon pool. Nothing is loaded unless all files
    /// parse.
    pub fn load_from_file_paths_parallel_with_threshold<P: AsRef<Path> + Sync>(
        &mut self,
        paths: &[P],
        mmap_threshold_bytes: u64,
    ) -> Result<(), IngestError> {
        let runs = paths
            .par_iter()
            .map(|p| {
                parse_file(p, mmap_threshold_bytes).map(|result| SourceRun {
                    source: p.as_ref().display().to_string(),
                    result,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.runs.extend(runs);
        Ok(())
    }

    /// Convenience wrapper that uses the default mmap threshold.
    pub fn load_from_file_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), IngestError> {
        self.load_from_file_paths_with_threshold(paths, DEFAULT_MMAP_THRESHOLD_BYTES)
    }

    /// Every record across all runs, run by run.
    pub fn records(&self) -> impl Iterator<Item = &CredentialRecord> {
        self.runs.iter().flat_map(|r| r.result.records.values())
    }

    pub fn record_count(&self) -> usize {
        self.runs.iter().map(|r| r.result.records.len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.runs.iter().map(|r| r.result.failures.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::LineFailure;
    use std::io::Cursor;

    fn secrets<'a>(res: &'a RunResult, id: &str) -> &'a [String] {
        &res.records.get(id).unwrap().secrets
    }

    #[test]
    fn mixed_delimiters_with_trailing_duplicate() {
        let res = parse_str("a@b.com:pw1\nc@d.com;pw2\ne@f.com~~~pw3\na@b.com:pw1");
        assert_eq!(res.records.len(), 3);
        assert_eq!(secrets(&res, "a@b.com"), ["pw1"]);
        assert_eq!(secrets(&res, "c@d.com"), ["pw2"]);
        assert_eq!(secrets(&res, "e@f.com"), ["pw3"]);
        let failures = res.error().unwrap().as_slice();
        assert_eq!(
            failures,
            [LineFailure {
                line_number: 4,
                raw: "a@b.com:pw1".to_string(),
                reason: FailureReason::Duplicate,
            }]
        );
    }

    #[test]
    fn line_without_identity_fails_at_line_one() {
        let res = parse_str("not-an-email-line");
        assert!(res.records.is_empty());
        let f = res.error().unwrap();
        assert_eq!(f.len(), 1);
        assert_eq!(f.as_slice()[0].line_number, 1);
        assert_eq!(f.as_slice()[0].reason, FailureReason::Unparseable);
    }

    #[test]
    fn secrets_accumulate_in_input_order_across_failures() {
        let input = "x@y.org:first\ngarbage\nsecond:x@y.org\nx@y.org:first\nx@y.org,third";
        let res = parse_str(input);
        assert_eq!(res.records.len(), 1);
        assert_eq!(secrets(&res, "x@y.org"), ["first", "second", "third"]);
        let reasons: Vec<_> = res.failures.iter().map(|f| (f.line_number, f.reason)).collect();
        assert_eq!(
            reasons,
            vec![(2, FailureReason::Unparseable), (4, FailureReason::Duplicate)]
        );
        assert_eq!(res.lines_read, 5);
    }

    #[test]
    fn backward_and_forward_produce_the_same_record() {
        for delim in [":", ";", ",", "~~~"] {
            let fwd = parse_str(&format!("alice@corp.io{delim}hunter2"));
            let bwd = parse_str(&format!("hunter2{delim}alice@corp.io"));
            assert_eq!(fwd.records, bwd.records, "delimiter {delim:?}");
            let rec = &fwd.records["alice@corp.io"];
            assert_eq!(rec.local_part, "alice");
            assert_eq!(rec.domain, "corp.io");
            assert_eq!(rec.secrets, ["hunter2"]);
        }
    }

    #[test]
    fn extra_tilde_before_backward_identity_stays_in_secret() {
        let res = parse_str("pw~~~~a@b.com");
        assert!(res.failures.is_empty());
        assert_eq!(secrets(&res, "a@b.com"), ["pw~"]);
    }

    #[test]
    fn lines_differing_only_in_invalid_bytes_are_not_duplicates() {
        let res = parse_reader(Cursor::new(b"a@b.com:pw\xff\na@b.com:pw\xfe\n".to_vec())).unwrap();
        assert!(res.failures.is_empty());
        assert_eq!(secrets(&res, "a@b.com"), ["pw\u{fffd}", "pw\u{fffd}"]);

        let repeated = parse_reader(Cursor::new(b"a@b.com:pw\xff\na@b.com:pw\xff\n".to_vec())).unwrap();
        assert_eq!(repeated.failures.count_of(FailureReason::Duplicate), 1);
        assert_eq!(repeated.failures.as_slice()[0].raw, "a@b.com:pw\u{fffd}");
    }

    #[test]
    fn repeated_junk_line_is_reported_as_duplicate() {
        let res = parse_str("junk\njunk");
        let reasons: Vec<_> = res.failures.iter().map(|f| f.reason).collect();
        assert_eq!(reasons, vec![FailureReason::Unparseable, FailureReason::Duplicate]);
    }

    #[test]
    fn record_rejects_identity_without_both_halves() {
        let mut acc = Accumulator::new();
        acc.record(1, b"@x.org:pw", "@x.org", "pw");
        acc.record(2, b"nobody:pw", "nobody", "pw");
        let res = acc.finish();
        assert!(res.records.is_empty());
        assert_eq!(res.failures.count_of(FailureReason::MissingIdentityFields), 2);
    }

    #[test]
    fn independent_runs_are_identical() {
        let input = "a@b.com:1\nbad\nb@b.com;2\na@b.com~~~3\nbad";
        assert_eq!(parse_str(input), parse_str(input));
        let streamed = parse_reader(Cursor::new(input)).unwrap();
        assert_eq!(streamed, parse_str(input));

        for input in ["a@b.com:pw\r", "a@b.com:pw\r\nc@d.com;x\r\n"] {
            let streamed = parse_reader(Cursor::new(input)).unwrap();
            assert_eq!(streamed, parse_str(input));
            assert_eq!(secrets(&streamed, "a@b.com"), ["pw"]);
        }
    }

    #[test]
    fn no_failures_means_no_error() {
        let (records, err) = parse_str("a@b.com:1").into_parts();
        assert_eq!(records.len(), 1);
        assert!(err.is_none());
    }

    #[test]
    fn read_error_aborts_the_run() {
        let lines: Vec<io::Result<&str>> = vec![
            Ok("a@b.com:1"),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "closed")),
            Ok("c@d.com:2"),
        ];
        match parse_lines(lines) {
            Err(IngestError::Read { line_number, .. }) => assert_eq!(line_number, 2),
            other => panic!("expected read error, got {:?}", other),
        }
    }

    #[test]
    fn engine_keeps_sources_separate() {
        let mut e = Engine::new();
        e.load_from_strings(&["a@b.com:1\na@b.com:1", "a@b.com:1"]);
        assert_eq!(e.runs.len(), 2);
        assert_eq!(e.runs[1].source, "input-2");
        assert_eq!(e.record_count(), 2);
        assert_eq!(e.failure_count(), 1);
        assert_eq!(e.records().count(), 2);
    }
}
