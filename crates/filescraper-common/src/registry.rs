//! Declarative registration of detectors and scrapers.
//!
//! Scraper types register a static entry instead of being discovered at
//! runtime. Iteration follows registration order, so the first registered
//! scraper wins ties during merging.

use std::path::Path;
use std::sync::Arc;

use crate::config::ToolsConfig;
use crate::detector::Detector;
use crate::model::Support;
use crate::params::Params;
use crate::scraper::{Scraper, ScraperArgs};

pub type ScraperFactory = fn(ScraperArgs) -> Box<dyn Scraper>;
pub type DetectorFactory = fn(&Path, Arc<ToolsConfig>) -> Box<dyn Detector>;

/// Registration record for a scraper type.
#[derive(Clone, Copy)]
pub struct ScraperEntry {
    pub name: &'static str,
    /// Scraper-level flag, in addition to the model tables.
    pub only_wellformed: bool,
    /// Support tables of every metadata model the scraper can produce.
    pub metadata: &'static [&'static Support],
    pub build: ScraperFactory,
}

impl ScraperEntry {
    /// Whether any of the scraper's models accepts the given file type.
    pub fn is_supported(
        &self,
        mimetype: Option<&str>,
        version: Option<&str>,
        check_wellformed: bool,
        params: &Params,
    ) -> bool {
        let Some(mimetype) = mimetype else {
            return false;
        };
        if self.only_wellformed && !check_wellformed {
            return false;
        }
        self.metadata
            .iter()
            .any(|support| support.is_supported(mimetype, version, check_wellformed, params))
    }
}

impl std::fmt::Debug for ScraperEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperEntry")
            .field("name", &self.name)
            .field("only_wellformed", &self.only_wellformed)
            .finish_non_exhaustive()
    }
}

/// Registration record for a detector type.
#[derive(Clone, Copy)]
pub struct DetectorEntry {
    pub name: &'static str,
    pub build: DetectorFactory,
}

impl std::fmt::Debug for DetectorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The ordered set of known detectors and scrapers.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    detectors: Vec<DetectorEntry>,
    scrapers: Vec<ScraperEntry>,
    utf8_check: Option<ScraperEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detector(mut self, entry: DetectorEntry) -> Self {
        self.detectors.push(entry);
        self
    }

    pub fn scraper(mut self, entry: ScraperEntry) -> Self {
        self.scrapers.push(entry);
        self
    }

    /// The scraper run as a second pass over files declaring UTF-8.
    pub fn utf8_check(mut self, entry: ScraperEntry) -> Self {
        self.utf8_check = Some(entry);
        self
    }

    pub fn iter_detectors(&self) -> impl Iterator<Item = &DetectorEntry> {
        self.detectors.iter()
    }

    /// Scrapers accepting the given file type, in registration order.
    /// Yields nothing when no scraper matches.
    pub fn iter_scrapers<'a>(
        &'a self,
        mimetype: Option<&'a str>,
        version: Option<&'a str>,
        check_wellformed: bool,
        params: &'a Params,
    ) -> impl Iterator<Item = &'a ScraperEntry> + 'a {
        self.scrapers
            .iter()
            .filter(move |entry| entry.is_supported(mimetype, version, check_wellformed, params))
    }

    pub fn utf8_scraper(&self) -> Option<&ScraperEntry> {
        self.utf8_check.as_ref()
    }
}
