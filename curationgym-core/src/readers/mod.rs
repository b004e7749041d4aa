//! readers - Source-format adapters that turn raw bytes into `Document`s
//! (§6). Every reader in this module is lenient: a malformed record is
//! skipped with a logged warning rather than aborting the whole read, since
//! one bad record in a multi-gigabyte crawl dump should not sink the run
//! (§7, "Input malformed").

pub mod tabular;
pub mod warc;

pub use tabular::read_jsonl;
pub use warc::{read_warc, read_wet};
