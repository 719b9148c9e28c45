//! Scrapers and their metadata models, one module per tool.
//!
//! Each scraper type exposes a `ScraperEntry` constant for registration.
//! Models are built from an owned snapshot of the tool output, so their
//! accessors never touch the file again.

/// Accessors for the `state` field every scraper carries.
macro_rules! scraper_state {
    () => {
        fn state(&self) -> &filescraper_common::ScraperState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut filescraper_common::ScraperState {
            &mut self.state
        }
    };
}

mod csv;
mod dummy;
mod ffmpeg;
mod jhove;
mod office;
mod schematron;
mod textfile;
mod verapdf;
mod xml;

pub use self::csv::{CsvMeta, CsvScraper};
pub use dummy::{FileExists, ScraperNotFound, SCRAPER_NOT_FOUND};
pub use ffmpeg::{FfmpegMeta, FfmpegScraper};
pub use jhove::{JHoveMeta, JHoveScraper};
pub use office::{OfficeMeta, OfficeScraper};
pub use schematron::{SchematronMeta, SchematronScraper};
pub use textfile::TextfileScraper;
pub use verapdf::{VerapdfMeta, VerapdfScraper};
pub use xml::{XmlEncodingMeta, XmlEncodingScraper, XmllintMeta, XmllintScraper};

/// Drop trailing zeros of a decimal rendering, and the dot if nothing
/// follows it: `"48.000"` becomes `"48"`, `"0.50"` becomes `"0.5"`.
pub(crate) fn strip_zeros(number: &str) -> String {
    if !number.contains('.') {
        return number.to_string();
    }
    number
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
