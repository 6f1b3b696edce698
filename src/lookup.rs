//! Filter lookups over parsed records or exported storage items.
//!
//! A filter containing `@` names one identity (matched on domain and
//! local-part, the composite storage key); anything else names a domain and
//! matches every identity under it.
use std::borrow::Cow;
use std::io::BufRead;

use percent_encoding::percent_decode_str;
use serde::Serialize;

use crate::credential::{CredentialRecord, StorageItem, split_identity};
use crate::failure::IngestError;
use crate::io::iter_lines_reader;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("invalid request; must pass a filter for query")]
    EmptyFilter,
    #[error("filter is not valid UTF-8 once decoded")]
    Encoding,
    #[error("filter [{0}] must have both a username and a domain around '@'")]
    MalformedIdentity(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Identity { local_part: String, domain: String },
    Domain(String),
}

impl Filter {
    /// Parse a raw (possibly percent-encoded) query value.
    pub fn parse(raw: &str) -> Result<Self, LookupError> {
        let decoded: Cow<'_, str> = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| LookupError::Encoding)?;
        if decoded.is_empty() {
            return Err(LookupError::EmptyFilter);
        }
        if !decoded.contains('@') {
            return Ok(Filter::Domain(decoded.into_owned()));
        }
        match split_identity(&decoded) {
            Some((local_part, domain)) if !local_part.is_empty() && !domain.is_empty() => {
                Ok(Filter::Identity {
                    local_part: local_part.to_string(),
                    domain: domain.to_string(),
                })
            }
            _ => Err(LookupError::MalformedIdentity(decoded.to_string())),
        }
    }

    pub fn matches(&self, record: &CredentialRecord) -> bool {
        match self {
            Filter::Identity { local_part, domain } => {
                record.domain == *domain && record.local_part == *local_part
            }
            Filter::Domain(domain) => record.domain == *domain,
        }
    }
}

/// Body returned to a lookup caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    /// Items that could not be decoded into a record.
    pub error_count: usize,
    pub credlist: Vec<CredentialRecord>,
}

/// Select the records matching `filter`, preserving iteration order.
pub fn lookup<'a, I>(records: I, filter: &Filter) -> LookupResponse
where
    I: IntoIterator<Item = &'a CredentialRecord>,
{
    LookupResponse {
        error_count: 0,
        credlist: records
            .into_iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect(),
    }
}

/// Query a JSON-lines file of [`StorageItem`]s. Lines that do not decode are
/// counted in `error_count` and skipped; blank lines are ignored.
pub fn lookup_items<R: BufRead>(reader: R, filter: &Filter) -> Result<LookupResponse, IngestError> {
    let mut resp = LookupResponse::default();
    for (idx, line) in iter_lines_reader(reader).enumerate() {
        let line = line.map_err(|source| IngestError::Read {
            line_number: idx + 1,
            source,
        })?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<StorageItem>(&line) {
            Ok(item) => {
                let record = CredentialRecord::from(item);
                if filter.matches(&record) {
                    resp.credlist.push(record);
                }
            }
            Err(e) => {
                log::warn!("failed to decode stored credential at line {}: {}", idx + 1, e);
                resp.error_count += 1;
            }
        }
    }
    Ok(resp)
}
