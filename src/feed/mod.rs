//! Feed retrieval: RSS/Atom fetching and parsing, OPML subscription import.
//!
//! - [`parser`] - feed XML into structured items using the `feed-rs` crate
//! - [`fetcher`] - concurrent HTTP retrieval with per-source failure isolation
//! - [`opml`] - outline-format subscription file parsing

mod fetcher;
mod opml;
mod parser;

pub use fetcher::{FeedTransport, FetchError, FetchedFeed, HttpTransport, SourceFetch};
pub use opml::parse_opml;
pub use parser::FetchedItem;
