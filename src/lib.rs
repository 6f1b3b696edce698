pub mod credential;
pub mod engine;
pub mod export;
pub mod failure;
pub mod io;
pub mod line;
pub mod lookup;
pub mod report;
pub mod stats;

pub mod prelude {
    pub use crate::credential::{CredentialRecord, StorageItem, split_identity};
    pub use crate::engine::{Accumulator, Engine, RunResult, parse_lines, parse_reader, parse_str};
    pub use crate::failure::{FailureReason, IngestError, LineFailure, ParseFailures};
    pub use crate::line::{LineMatch, split_line};
}
