//! Human-readable report rendering for terminal output.
//!
//! Produces a colored summary: overall parse statistics, a per-source table,
//! the domain breakdown and the most reused secrets.
use colored::*;

use crate::{
    engine::Engine,
    stats::{DomainStats, calculate_statistics, domains_breakdown, top_reused_secrets},
};

fn visible_len(s: &str) -> usize {
    // Strip ANSI escape sequences (\x1b[ ... m) to compute printable width
    let mut len = 0;
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            len += 1;
        }
    }
    len
}

fn section_header(title: &str) -> String {
    let len = visible_len(title);
    let mut s = String::new();
    s.push('\n');
    s.push_str(title);
    s.push('\n');
    s.push_str(&"─".repeat(len));
    s.push_str("\n\n");
    s
}

fn push_section(out: &mut String, title: ColoredString, lines: Vec<String>) {
    out.push_str(&section_header(&title.to_string()));
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
}

pub fn render_summary(engine: &Engine) -> String {
    render_summary_with_top(engine, 10)
}

pub fn render_summary_with_top(engine: &Engine, top_n: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        "credsift: Credential Dump Normalization Results".bold().cyan()
    ));

    let stats = calculate_statistics(engine);
    let stats_lines = vec![
        format!("Sources: {}", engine.runs.len()),
        format!("Lines read: {}", stats.lines_read),
        format!("Identities: {}", stats.record_count),
        format!("Secrets: {}", stats.secret_count),
        format!("Identities with several secrets: {}", stats.multi_secret_records),
        format!("Accepted lines: {}", stats.accepted_percentage),
        "Failed lines".bold().blue().to_string(),
        format!("  Unparseable: {}", stats.unparseable),
        format!("  Duplicate: {}", stats.duplicates),
        format!("  Missing identity fields: {}", stats.missing_identity),
    ];
    push_section(&mut out, "Parse Statistics".bold().yellow(), stats_lines);

    let mut source_lines = Vec::new();
    if engine.runs.is_empty() {
        source_lines.push("(No sources loaded)".to_string());
    }
    for run in &engine.runs {
        let failed = run.result.failures.len();
        let failed_text = if failed == 0 {
            "0 failed".dimmed().to_string()
        } else {
            format!("{} failed", failed).red().to_string()
        };
        source_lines.push(format!(
            "  {}: {} identities, {}",
            run.source,
            run.result.records.len(),
            failed_text
        ));
    }
    push_section(&mut out, "Sources".bold().cyan(), source_lines);

    let mut domain_lines = Vec::new();
    let mut by_domain: Vec<(String, DomainStats)> =
        domains_breakdown(engine.records()).into_iter().collect();
    by_domain.sort_by(|a, b| a.0.cmp(&b.0));
    if by_domain.is_empty() {
        domain_lines.push("(No domains)".to_string());
    } else {
        for (dom, s) in by_domain {
            domain_lines.push(format!("{}", dom.bold().green()));
            domain_lines.push(format!("  Identities: {}", s.identities));
            domain_lines.push(format!("  Secrets: {}", s.secrets));
        }
    }
    push_section(&mut out, "Domain Breakdown".bold().cyan(), domain_lines);

    let mut top_lines = Vec::new();
    let top = top_reused_secrets(engine.records(), top_n);
    if top.is_empty() {
        top_lines.push("(No reused secrets)".to_string());
    } else {
        for (secret, count) in top {
            top_lines.push(format!("  {}: {}", secret, count));
        }
    }
    push_section(&mut out, "Top Reused Secrets".bold().magenta(), top_lines);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn header_underline_ignores_ansi_codes() {
        assert_eq!(visible_len("\u{1b}[1;33mStats\u{1b}[0m"), 5);
        let header = section_header("\u{1b}[1mAbc\u{1b}[0m");
        assert!(header.ends_with("\n───\n\n"));
    }

    #[test]
    fn summary_lists_sections_and_counts() {
        colored::control::set_override(false);
        let mut e = Engine::new();
        e.load_from_strings(&["a@b.com:pw\nbroken line\nc@b.com:pw"]);
        let s = render_summary(&e);
        assert!(s.contains("Parse Statistics"));
        assert!(s.contains("Identities: 2"));
        assert!(s.contains("  Unparseable: 1"));
        assert!(s.contains("  input-1: 2 identities, 1 failed"));
        assert!(s.contains("b.com\n  Identities: 2\n  Secrets: 2"));
        assert!(s.contains("  pw: 2"));
    }

    #[test]
    fn top_reused_respects_limit() {
        colored::control::set_override(false);
        let mut e = Engine::new();
        e.load_from_strings(&["a@x.io:pw\nb@x.io:pw\nc@x.io:other\nd@x.io:other\ne@x.io:pw"]);
        let s = render_summary_with_top(&e, 1);
        assert!(s.contains("Top Reused Secrets"));
        assert!(s.contains("pw: 3"));
        assert!(!s.contains("other: 2"));
    }
}
