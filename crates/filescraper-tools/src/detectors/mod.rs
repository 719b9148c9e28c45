//! MIME type detectors.
//!
//! Detectors run before any scraper and only guess. The first guess that
//! is not missing wins, except where a detector marks a value important.

mod magic;
mod magic_bytes;

pub use magic::MagicDetector;
pub use magic_bytes::MagicBytesDetector;
