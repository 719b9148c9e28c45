//! Filescraper-Common: plugin contracts and the stream merge rule.
//!
//! This crate provides the pieces every detector, scraper and metadata model
//! is built on:
//!
//! - **Values**: [`Value`] with an explicit "unavailable" case and [`Field`]
//!   for accessors that do not apply to a stream type
//! - **Models**: the [`MetadataModel`] trait and its static [`Support`] table
//! - **Scrapers**: the [`Scraper`] trait with its shared [`ScraperState`]
//! - **Detectors**: the [`Detector`] trait and [`Important`] overrides
//! - **Merging**: [`merge_streams`] folding per-scraper records into
//!   one record per stream
//! - **Registry**: declarative [`Registry`] of scraper and detector types
//!
//! # Examples
//!
//! ```
//! use filescraper_common::{merge_streams, Entry, ModelRecord, Value};
//!
//! let jhove = [ModelRecord {
//!     index: 0,
//!     entries: vec![Entry::new("version", Value::new("1.4"), false)],
//! }];
//! let verapdf = [ModelRecord {
//!     index: 0,
//!     entries: vec![Entry::new("version", Value::new("A-1b"), true)],
//! }];
//! let merged = merge_streams([&jhove[..], &verapdf[..]]);
//! assert_eq!(merged.streams[&0].version(), &Value::new("A-1b"));
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod model;
pub mod params;
pub mod registry;
pub mod scraper;
pub mod stream;
pub mod value;

pub use config::ToolsConfig;
pub use detector::{Detector, DetectorState, Important};
pub use error::{Error, Result};
pub use model::{Accessor, MetadataModel, Overrides, Support};
pub use params::Params;
pub use registry::{DetectorEntry, Registry, ScraperEntry};
pub use scraper::{Scraper, ScraperArgs, ScraperInfo, ScraperState, SKIP_MESSAGE};
pub use stream::{merge_streams, Entry, Merged, ModelRecord, StreamMerger, StreamRecord, StreamSet};
pub use value::{Field, Value, UNAV};

/// Fold one scraper's well-formed outcome into the running aggregate.
///
/// The aggregate starts unknown, becomes `true` on the first positive
/// outcome and `false` on any negative one. Once `false` it stays `false`.
pub fn fold_well_formed(current: Option<bool>, next: Option<bool>) -> Option<bool> {
    match (current, next) {
        (Some(false), _) => Some(false),
        (current, None) => current,
        (_, Some(outcome)) => Some(outcome),
    }
}
