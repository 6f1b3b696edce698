//! Export helpers for writing results to files.
//!
//! - `save_records_csv` writes one row per (identity, secret) pair.
//! - `save_items_jsonl` writes one storage item per `(domainname, username)`
//!   key, ready for a key/value store loader (and readable by
//!   `lookup::lookup_items`). An identity seen in several sources is merged
//!   into one item whose secrets follow source order.
//! - `save_failures_txt` writes every failed line with its source.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use crate::credential::StorageItem;
use crate::engine::Engine;

pub fn save_records_csv<P: AsRef<Path>>(engine: &Engine, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    wtr.write_record(["Source", "Email", "Username", "Domain", "Password"])?;
    for run in &engine.runs {
        for rec in run.result.records.values() {
            for secret in &rec.secrets {
                wtr.write_record([
                    run.source.as_str(),
                    rec.identity.as_str(),
                    rec.local_part.as_str(),
                    rec.domain.as_str(),
                    secret.as_str(),
                ])?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_items_jsonl<P: AsRef<Path>>(engine: &Engine, path: P) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut items: BTreeMap<(String, String), StorageItem> = BTreeMap::new();
    for rec in engine.records() {
        let key = (rec.domain.clone(), rec.local_part.clone());
        match items.get_mut(&key) {
            Some(item) => item.password.extend(rec.secrets.iter().cloned()),
            None => {
                items.insert(key, StorageItem::from(rec));
            }
        }
    }
    let mut w = BufWriter::new(f);
    for item in items.values() {
        serde_json::to_writer(&mut w, item)?;
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(())
}

pub fn save_failures_txt<P: AsRef<Path>>(engine: &Engine, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    for run in &engine.runs {
        for failure in &run.result.failures {
            writeln!(f, "{}: {}", run.source, failure)?;
        }
    }
    Ok(())
}
