//! Research record handling: similarity scoring, finding deduplication,
//! defensive parsing of generator output, and user/automated merging.
//!
//! Everything here is synchronous and pure apart from logging; the calls
//! to remote capabilities live in `postcraft-core`.

pub mod dedup;
pub mod merge;
pub mod parser;
pub mod similarity;

pub use dedup::{dedup, dedup_with_threshold};
pub use merge::{merge, merge_with_threshold};
pub use parser::{FindingDefaults, SUMMARY_PLACEHOLDER, parse_research_output, parse_with_defaults};
pub use similarity::{DEDUP_THRESHOLD, similarity};
