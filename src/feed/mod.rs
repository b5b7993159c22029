//! Feed retrieval: HTTP fetching and RSS/Atom parsing.
//!
//! - [`fetcher`] - bounded HTTP GET with an identifying user agent
//! - [`parser`] - RSS 2.0 via `quick-xml`, everything else via `feed-rs`,
//!   normalized to one channel/items shape with HTML entities decoded

mod fetcher;
mod parser;

pub use fetcher::{FetchError, Fetcher};
pub use parser::{parse_feed, RssFeed, RssItem};
