//! The scrape orchestrator.
//!
//! [`FileScraper::scrape`] checks that the file exists, lets every detector
//! guess the file type, runs the scrapers registered for that type and folds
//! their streams into one record per stream. Every call starts from scratch;
//! nothing is kept between calls.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filescraper_common::{
    fold_well_formed, merge_streams, params, Detector, ModelRecord, Overrides, Params, Registry,
    Result, Scraper, ScraperArgs, ScraperInfo, StreamRecord, StreamSet, ToolsConfig, Value, UNAV,
};
use filescraper_tools::scrapers::{FileExists, ScraperNotFound, TextfileScraper};

use crate::checksum::{self, Algorithm};
use crate::registry::default_registry;

/// Character set that triggers the UTF-8 second pass.
const UTF8: &str = "UTF-8";

/// Outcome of one scrape.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeResult {
    pub mimetype: Value,
    pub version: Value,
    /// `None` when nothing that checks well-formedness ran.
    pub well_formed: Option<bool>,
    pub streams: StreamSet,
    /// One entry per detector and scraper, in run order.
    pub info: BTreeMap<usize, ScraperInfo>,
    /// Disagreements settled by the merge, for diagnostics.
    pub conflicts: Vec<String>,
}

/// The file type guessed by the detectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Guess {
    mimetype: Option<String>,
    version: Option<String>,
}

fn resolved(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.is_empty() && *v != UNAV)
        .map(str::to_string)
}

/// Accumulates scraper outcomes during one scrape.
#[derive(Default)]
struct Run {
    info: BTreeMap<usize, ScraperInfo>,
    well_formed: Option<bool>,
    results: Vec<Vec<ModelRecord>>,
}

impl Run {
    fn record_info(&mut self, info: ScraperInfo) {
        self.info.insert(self.info.len(), info);
    }

    fn scrape(&mut self, scraper: &mut dyn Scraper) -> Result<()> {
        let outcome = scraper.scrape_file();
        let records = scraper.records();
        if !records.is_empty() {
            self.results.push(records);
        }
        self.record_info(scraper.info());
        self.well_formed = fold_well_formed(self.well_formed, scraper.well_formed());
        outcome
    }

    fn merge(&self) -> (StreamSet, Vec<String>) {
        let merged = merge_streams(self.results.iter().map(Vec::as_slice));
        (merged.streams, merged.conflicts)
    }
}

/// Identifies and scrapes a single file.
///
/// # Example
///
/// ```no_run
/// use filescraper::FileScraper;
///
/// let result = FileScraper::new("/path/to/file.pdf").scrape(true)?;
/// println!("{} {} {:?}", result.mimetype, result.version, result.well_formed);
/// # Ok::<(), filescraper_common::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileScraper {
    path: PathBuf,
    params: Params,
    registry: Registry,
    tools: Arc<ToolsConfig>,
}

impl FileScraper {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            params: Params::new(),
            registry: default_registry(),
            tools: Arc::new(ToolsConfig::default()),
        }
    }

    /// Scraper parameters, including `mimetype`/`version` overrides.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_tools(mut self, tools: Arc<ToolsConfig>) -> Self {
        self.tools = tools;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn args(&self, check_wellformed: bool) -> ScraperArgs {
        ScraperArgs::new(&self.path, check_wellformed).with_tools(Arc::clone(&self.tools))
    }

    /// Scrape the file.
    ///
    /// Only a missing external tool is returned as an error; everything
    /// else ends up in the result's info entries and `well_formed`.
    pub fn scrape(&self, check_wellformed: bool) -> Result<ScrapeResult> {
        tracing::debug!(path = %self.path.display(), check_wellformed, "scraping file");
        let mut run = Run::default();

        let mut file_exists = FileExists::new(self.args(check_wellformed));
        run.scrape(&mut file_exists)?;
        if file_exists.well_formed() == Some(false) {
            return Ok(ScrapeResult {
                well_formed: run.well_formed,
                info: run.info,
                ..Default::default()
            });
        }

        let guess = self.identify(&mut run)?;

        // A forced type selects the scrapers whatever its version, so an
        // unsupported forced version is reported by the support check
        // instead of silently dropping every scraper. The detectors' guess
        // is still handed over as the prediction.
        let forced_mimetype = resolved(self.params.get_str(params::MIMETYPE));
        let (select_mimetype, select_version) = match &forced_mimetype {
            Some(mime) => (Some(mime.clone()), None),
            None => (guess.mimetype.clone(), guess.version.clone()),
        };

        let entries: Vec<_> = self
            .registry
            .iter_scrapers(
                select_mimetype.as_deref(),
                select_version.as_deref(),
                check_wellformed,
                &self.params,
            )
            .copied()
            .collect();

        if entries.is_empty() {
            let args = self
                .args(check_wellformed)
                .with_params(self.params.clone());
            let mut not_found = ScraperNotFound::new(args);
            run.scrape(&mut not_found)?;
        }
        for entry in entries {
            let args = self
                .args(check_wellformed)
                .with_params(self.params.clone())
                .with_predicted_mimetype(guess.mimetype.clone());
            let mut scraper = (entry.build)(args);
            run.scrape(&mut *scraper)?;
        }

        let (mut streams, mut conflicts) = run.merge();
        streams.entry(0).or_insert_with(StreamRecord::new);

        if self.declares_utf8(&streams) {
            if let Some(entry) = self.registry.utf8_scraper() {
                let mut scraper = (entry.build)(self.args(check_wellformed));
                run.scrape(&mut *scraper)?;
                (streams, conflicts) = run.merge();
                streams.entry(0).or_insert_with(StreamRecord::new);
            }
        }

        let primary = streams.entry(0).or_insert_with(StreamRecord::new);
        let overrides = Overrides::from_params(&self.params);
        if !overrides.is_empty() {
            // Also covers runs where no scraper accepted the forced type.
            primary.set("mimetype", overrides.mimetype(primary.mimetype().clone()));
            primary.set("version", overrides.version(primary.version().clone()));
        }

        let mimetype = if primary.mimetype().is_missing() {
            let value = Value::from_option(guess.mimetype.clone());
            primary.set("mimetype", value.clone());
            value
        } else {
            primary.mimetype().clone()
        };
        // The guessed version only means something for the guessed type.
        let version = if primary.version().is_missing()
            && guess.mimetype.as_deref() == mimetype.known()
        {
            let value = Value::from_option(guess.version.clone());
            primary.set("version", value.clone());
            value
        } else {
            primary.version().clone()
        };

        Ok(ScrapeResult {
            mimetype,
            version,
            well_formed: run.well_formed,
            streams,
            info: run.info,
            conflicts,
        })
    }

    /// Run every detector and combine their guesses.
    ///
    /// The first detector to report a MIME type sets it; a version is taken
    /// from a detector agreeing on the MIME type while none is known yet.
    /// Important values override everything seen so far.
    fn identify(&self, run: &mut Run) -> Result<Guess> {
        let mut guess = Guess::default();
        for entry in self.registry.iter_detectors() {
            let mut detector = (entry.build)(&self.path, Arc::clone(&self.tools));
            match detector.detect() {
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => detector.state_mut().error(e.to_string()),
                Ok(()) => {}
            }
            tracing::debug!(
                detector = detector.name(),
                mimetype = ?detector.mimetype(),
                version = ?detector.version(),
                "detector finished"
            );
            run.record_info(detector.info());
            Self::combine(&mut guess, &*detector);
        }
        Ok(guess)
    }

    fn combine(guess: &mut Guess, detector: &dyn Detector) {
        let mimetype = resolved(detector.mimetype());
        if guess.mimetype.is_none() {
            guess.mimetype = mimetype.clone();
        }
        if guess.version.is_none() && guess.mimetype == mimetype {
            guess.version = resolved(detector.version());
        }

        let important = detector.important();
        if let Some(mime) = resolved(important.mimetype.as_deref()) {
            guess.mimetype = Some(mime);
        }
        if let Some(version) = guess
            .mimetype
            .as_ref()
            .and_then(|mime| important.version.get(mime))
        {
            guess.version = resolved(Some(version));
        }
    }

    fn declares_utf8(&self, streams: &StreamSet) -> bool {
        streams
            .get(&0)
            .and_then(|primary| primary.get("charset"))
            .and_then(Value::known)
            == Some(UTF8)
    }

    /// Whether `file` considers this a text file. `None` if it could not
    /// tell.
    pub fn is_textfile(&self) -> Result<Option<bool>> {
        let mut scraper = TextfileScraper::new(self.args(true));
        scraper.scrape_file()?;
        Ok(scraper.well_formed())
    }

    /// Hex digest of the file.
    pub fn checksum(&self, algorithm: Algorithm) -> Result<String> {
        checksum::hexdigest(&self.path, algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filescraper_common::{DetectorState, Important};

    struct Fixed {
        state: DetectorState,
    }

    impl Detector for Fixed {
        fn name(&self) -> &'static str {
            "Fixed"
        }

        fn state(&self) -> &DetectorState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut DetectorState {
            &mut self.state
        }

        fn detect(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn fixed(mimetype: Option<&str>, version: Option<&str>, important: Important) -> Fixed {
        let mut state = DetectorState::new("file", Arc::new(ToolsConfig::default()));
        state.mimetype = mimetype.map(str::to_string);
        state.version = version.map(str::to_string);
        state.important = important;
        Fixed { state }
    }

    #[test]
    fn test_first_detector_wins() {
        let mut guess = Guess::default();
        FileScraper::combine(&mut guess, &fixed(Some("text/xml"), Some("1.0"), Important::default()));
        FileScraper::combine(&mut guess, &fixed(Some("text/plain"), Some("2.0"), Important::default()));
        assert_eq!(guess.mimetype.as_deref(), Some("text/xml"));
        assert_eq!(guess.version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_version_only_from_agreeing_detector() {
        let mut guess = Guess::default();
        FileScraper::combine(&mut guess, &fixed(Some("text/xml"), None, Important::default()));
        FileScraper::combine(&mut guess, &fixed(Some("text/plain"), Some("2.0"), Important::default()));
        assert_eq!(guess.version, None);
        FileScraper::combine(&mut guess, &fixed(Some("text/xml"), Some("1.0"), Important::default()));
        assert_eq!(guess.version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_important_values_override() {
        let mut guess = Guess::default();
        FileScraper::combine(&mut guess, &fixed(Some("application/zip"), None, Important::default()));
        let important = Important {
            mimetype: Some("application/vnd.oasis.opendocument.text".into()),
            version: [("application/vnd.oasis.opendocument.text".to_string(), "1.2".to_string())]
                .into_iter()
                .collect(),
        };
        FileScraper::combine(&mut guess, &fixed(None, None, important));
        assert_eq!(
            guess.mimetype.as_deref(),
            Some("application/vnd.oasis.opendocument.text")
        );
        assert_eq!(guess.version.as_deref(), Some("1.2"));
    }

    #[test]
    fn test_unav_from_detector_counts_as_missing() {
        let mut guess = Guess::default();
        FileScraper::combine(&mut guess, &fixed(Some(UNAV), Some(UNAV), Important::default()));
        FileScraper::combine(&mut guess, &fixed(Some("image/png"), None, Important::default()));
        assert_eq!(guess.mimetype.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_missing_file_short_circuits() {
        let result = FileScraper::new("/nonexistent/file.pdf")
            .with_registry(Registry::new())
            .scrape(true)
            .unwrap();
        assert!(result.streams.is_empty());
        assert_eq!(result.well_formed, Some(false));
        assert_eq!(result.info.len(), 1);
        assert_eq!(result.info[&0].class, "FileExists");
        assert_eq!(result.mimetype, Value::Unavailable);
    }
}
