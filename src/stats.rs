//! Statistical summaries over parsed runs.
//!
//! `RunStats` counts lines, records, secrets and failures by reason; the
//! helpers below break records down per domain and rank reused secrets.
use std::collections::HashMap;

use crate::credential::CredentialRecord;
use crate::engine::Engine;
use crate::failure::FailureReason;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub lines_read: usize,
    pub record_count: usize,
    pub secret_count: usize,
    pub multi_secret_records: usize,
    pub unparseable: usize,
    pub duplicates: usize,
    pub missing_identity: usize,
    pub accepted_percentage: String,
}

fn pct(n: usize, d: usize) -> String {
    if d == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", (n as f64) / (d as f64) * 100.0)
}

pub fn calculate_statistics(engine: &Engine) -> RunStats {
    let mut s = RunStats::default();
    for run in &engine.runs {
        let r = &run.result;
        s.lines_read += r.lines_read;
        s.record_count += r.records.len();
        for rec in r.records.values() {
            s.secret_count += rec.secrets.len();
            if rec.secrets.len() > 1 {
                s.multi_secret_records += 1;
            }
        }
        s.unparseable += r.failures.count_of(FailureReason::Unparseable);
        s.duplicates += r.failures.count_of(FailureReason::Duplicate);
        s.missing_identity += r.failures.count_of(FailureReason::MissingIdentityFields);
    }
    // Every accepted line contributed exactly one secret.
    s.accepted_percentage = pct(s.secret_count, s.lines_read);
    s
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DomainStats {
    pub identities: usize,
    pub secrets: usize,
}

/// Identities and secrets per domain. Domains compare case-sensitively, as
/// they were written in the dump.
pub fn domains_breakdown<'a, I>(records: I) -> HashMap<String, DomainStats>
where
    I: IntoIterator<Item = &'a CredentialRecord>,
{
    let mut out: HashMap<String, DomainStats> = HashMap::new();
    for r in records {
        let entry = out.entry(r.domain.clone()).or_default();
        entry.identities += 1;
        entry.secrets += r.secrets.len();
    }
    out
}

/// Return the top-N most reused secrets across all records, sorted
/// descending by count, then ascending by secret.
pub fn top_reused_secrets<'a, I>(records: I, top_n: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a CredentialRecord>,
{
    use std::cmp::Reverse;
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for r in records {
        for secret in &r.secrets {
            *freq.entry(secret.as_str()).or_insert(0) += 1;
        }
    }
    let mut items: Vec<(String, usize)> = freq
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(s, n)| (s.to_string(), n))
        .collect();
    items.sort_by(|a, b| (Reverse(a.1), &a.0).cmp(&(Reverse(b.1), &b.0)));
    items.truncate(top_n);
    items
}
