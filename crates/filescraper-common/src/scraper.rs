//! The scraper contract.
//!
//! A scraper runs one extraction or validation step (usually an external
//! tool), records what happened as messages and errors, and yields one
//! [`MetadataModel`] per stream it understood. Shared bookkeeping lives in
//! [`ScraperState`]; implementations provide [`Scraper::run`] and get the
//! skip policy, error capture and support check from
//! [`Scraper::scrape_file`].

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ToolsConfig;
use crate::model::{MetadataModel, Overrides};
use crate::params::Params;
use crate::stream::ModelRecord;
use crate::Result;

/// Message recorded by scrapers skipped outside well-formedness checking.
pub const SKIP_MESSAGE: &str = "Skipping scraper: Well-formed check not used.";

/// Everything a scraper is constructed from.
#[derive(Debug, Clone)]
pub struct ScraperArgs {
    pub path: PathBuf,
    pub check_wellformed: bool,
    pub params: Params,
    /// The detectors' guess, distinct from a caller override.
    pub predicted_mimetype: Option<String>,
    pub tools: Arc<ToolsConfig>,
}

impl ScraperArgs {
    pub fn new(path: impl Into<PathBuf>, check_wellformed: bool) -> Self {
        Self {
            path: path.into(),
            check_wellformed,
            params: Params::new(),
            predicted_mimetype: None,
            tools: Arc::new(ToolsConfig::default()),
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_predicted_mimetype(mut self, mimetype: Option<String>) -> Self {
        self.predicted_mimetype = mimetype;
        self
    }

    pub fn with_tools(mut self, tools: Arc<ToolsConfig>) -> Self {
        self.tools = tools;
        self
    }
}

/// Diagnostic summary of one detector or scraper run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScraperInfo {
    pub class: String,
    pub messages: Vec<String>,
    pub errors: Vec<String>,
}

/// State shared by every scraper implementation.
#[derive(Debug)]
pub struct ScraperState {
    args: ScraperArgs,
    overrides: Overrides,
    messages: Vec<String>,
    errors: Vec<String>,
    streams: Vec<Box<dyn MetadataModel>>,
}

impl ScraperState {
    pub fn new(args: ScraperArgs) -> Self {
        let overrides = Overrides::from_params(&args.params);
        let mut messages = Vec::new();
        if let Some(msg) = overrides.message() {
            messages.push(msg.to_string());
        }
        Self {
            args,
            overrides,
            messages,
            errors: Vec::new(),
            streams: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.args.path
    }

    pub fn check_wellformed(&self) -> bool {
        self.args.check_wellformed
    }

    pub fn params(&self) -> &Params {
        &self.args.params
    }

    pub fn predicted_mimetype(&self) -> Option<&str> {
        self.args.predicted_mimetype.as_deref()
    }

    pub fn tools(&self) -> &ToolsConfig {
        &self.args.tools
    }

    /// Caller overrides, to be handed to the primary stream's model.
    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn message(&mut self, msg: impl Into<String>) {
        self.messages.push(msg.into());
    }

    pub fn error(&mut self, err: impl Into<String>) {
        self.errors.push(err.into());
    }

    pub fn push_stream(&mut self, model: Box<dyn MetadataModel>) {
        self.streams.push(model);
    }

    pub fn streams(&self) -> &[Box<dyn MetadataModel>] {
        &self.streams
    }

    /// Non-empty messages.
    pub fn messages(&self) -> Vec<String> {
        self.messages.iter().filter(|m| !m.is_empty()).cloned().collect()
    }

    /// Non-empty errors.
    pub fn errors(&self) -> Vec<String> {
        self.errors.iter().filter(|e| !e.is_empty()).cloned().collect()
    }

    /// `None` outside well-formedness checking, otherwise whether the run
    /// produced messages and no errors.
    pub fn well_formed(&self) -> Option<bool> {
        if !self.args.check_wellformed {
            return None;
        }
        let has_messages = self.messages.iter().any(|m| !m.is_empty());
        let has_errors = self.errors.iter().any(|e| !e.is_empty());
        Some(has_messages && !has_errors)
    }

    /// Verify every produced stream against its own model's support table.
    ///
    /// A stream reporting neither MIME type nor version makes no claim and
    /// is not checked, even at index 0: encoding-only checks such as the
    /// UTF-8 pass contribute to the primary stream without knowing its
    /// format, which other scrapers or the detectors supply. Forced values
    /// are checked like scraped ones.
    pub fn check_supported(&mut self) {
        let mut problems = Vec::new();
        for model in &self.streams {
            let mimetype = model.mimetype();
            let version = model.version();
            match mimetype.known() {
                // No format claim; the merge takes the type from elsewhere.
                None if version.is_missing() => {}
                None => problems.push("None is not a supported MIME type.".to_string()),
                Some(mime) => {
                    if !model.support().accepts_resolved(mime, &version) {
                        problems.push(format!(
                            "MIME type {} with version {} is not supported.",
                            mime,
                            version.known().unwrap_or("None")
                        ));
                    }
                }
            }
        }
        for problem in problems {
            if !self.errors.contains(&problem) {
                self.errors.push(problem);
            }
        }
    }

    pub fn info(&self, class: &str) -> ScraperInfo {
        ScraperInfo {
            class: class.to_string(),
            messages: self.messages(),
            errors: self.errors(),
        }
    }
}

/// A format-specific extraction and validation step.
pub trait Scraper: Send {
    /// Class name reported in the info log.
    fn name(&self) -> &'static str;

    fn state(&self) -> &ScraperState;

    fn state_mut(&mut self) -> &mut ScraperState;

    /// Whether the scraper is only meaningful under well-formedness
    /// checking. Such scrapers never run their tool otherwise.
    fn only_wellformed(&self) -> bool {
        false
    }

    /// The scraper-specific work. Tool failures that still leave usable
    /// output should be recorded on the state rather than returned.
    fn run(&mut self) -> Result<()>;

    /// Run end to end: apply the skip policy, run, record non-fatal errors
    /// and check the produced streams for support.
    ///
    /// Only fatal errors (a missing tool) are returned; the support check
    /// has already been applied when they are.
    fn scrape_file(&mut self) -> Result<()> {
        if self.only_wellformed() && !self.state().check_wellformed() {
            self.state_mut().message(SKIP_MESSAGE);
            return Ok(());
        }

        tracing::debug!(scraper = self.name(), path = %self.state().path().display(), "running scraper");
        let outcome = match self.run() {
            Err(e) if !e.is_fatal() => {
                self.state_mut().error(e.to_string());
                Ok(())
            }
            other => other,
        };
        self.state_mut().check_supported();
        outcome
    }

    fn well_formed(&self) -> Option<bool> {
        self.state().well_formed()
    }

    fn messages(&self) -> Vec<String> {
        self.state().messages()
    }

    fn errors(&self) -> Vec<String> {
        self.state().errors()
    }

    fn info(&self) -> ScraperInfo {
        self.state().info(self.name())
    }

    /// Records of every produced stream, in production order.
    fn records(&self) -> Vec<ModelRecord> {
        self.state().streams().iter().map(|m| m.to_record()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Accessor, Support};
    use crate::value::{Field, Value};
    use crate::Error;

    const BASIC: Support = Support::new(&[("test/mimetype", &["0.1", "0.2"])]);

    #[derive(Debug)]
    struct CustomMeta {
        mimetype: Option<&'static str>,
        version: Option<&'static str>,
        overrides: Option<Overrides>,
    }

    impl MetadataModel for CustomMeta {
        fn support(&self) -> &'static Support {
            &BASIC
        }

        fn overrides(&self) -> Option<&Overrides> {
            self.overrides.as_ref()
        }

        fn scraped_mimetype(&self) -> Value {
            Value::from_option(self.mimetype)
        }

        fn scraped_version(&self) -> Value {
            Value::from_option(self.version)
        }

        fn accessors(&self) -> Vec<Accessor> {
            vec![Accessor::new("stream_type", Field::known("binary"))]
        }
    }

    struct BasicScraper {
        state: ScraperState,
        wellformed_only: bool,
        fail_with: Option<fn() -> Error>,
    }

    impl BasicScraper {
        fn new(args: ScraperArgs) -> Self {
            Self {
                state: ScraperState::new(args),
                wellformed_only: false,
                fail_with: None,
            }
        }
    }

    impl Scraper for BasicScraper {
        fn name(&self) -> &'static str {
            "BasicScraper"
        }

        fn state(&self) -> &ScraperState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ScraperState {
            &mut self.state
        }

        fn only_wellformed(&self) -> bool {
            self.wellformed_only
        }

        fn run(&mut self) -> Result<()> {
            let overrides = self.state.overrides().clone();
            self.state.push_stream(Box::new(CustomMeta {
                mimetype: None,
                version: None,
                overrides: Some(overrides),
            }));
            match self.fail_with {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }
    }

    fn args() -> ScraperArgs {
        ScraperArgs::new("testfilename", true)
    }

    #[test]
    fn test_messages_errors_filter_empty() {
        let mut scraper = BasicScraper::new(args());
        scraper.state.message("test message");
        scraper.state.message("test message 2");
        scraper.state.message("");
        scraper.state.error("test error");
        scraper.state.error("test error 2");
        assert_eq!(scraper.messages(), vec!["test message", "test message 2"]);
        assert_eq!(scraper.errors(), vec!["test error", "test error 2"]);
    }

    #[test]
    fn test_well_formed_property() {
        let mut scraper = BasicScraper::new(args());
        assert_eq!(scraper.well_formed(), Some(false));
        scraper.state.message("success");
        assert_eq!(scraper.well_formed(), Some(true));
        scraper.state.error("error");
        assert_eq!(scraper.well_formed(), Some(false));

        let mut scraper = BasicScraper::new(ScraperArgs::new("testfilename", false));
        scraper.state.message("success");
        assert_eq!(scraper.well_formed(), None);
        scraper.state.error("error");
        assert_eq!(scraper.well_formed(), None);
    }

    #[test]
    fn test_overriding_filetype() {
        let cases: &[(Option<&str>, Option<&str>, &str, &str, Option<&str>)] = &[
            (None, None, "(:unav)", "(:unav)", None),
            (
                Some("test/override"),
                Some("99.9"),
                "test/override",
                "99.9",
                Some("MIME type and version not scraped, using user-supplied"),
            ),
            (
                Some("test/override"),
                None,
                "test/override",
                "(:unav)",
                Some("MIME type not scraped, using user-supplied value."),
            ),
            (None, Some("99.9"), "(:unav)", "(:unav)", None),
        ];
        for (mime, version, expected_mime, expected_version, expected_message) in cases {
            let mut params = Params::new();
            if let Some(m) = mime {
                params.insert("mimetype", *m);
            }
            if let Some(v) = version {
                params.insert("version", *v);
            }
            let mut scraper = BasicScraper::new(args().with_params(params));
            scraper.run().unwrap();
            let model = &scraper.state().streams()[0];
            assert_eq!(model.mimetype().as_str(), *expected_mime);
            assert_eq!(model.version().as_str(), *expected_version);
            match expected_message {
                Some(msg) => assert!(scraper.messages().iter().any(|m| m.contains(msg))),
                None => assert!(scraper.messages().is_empty()),
            }
        }
    }

    #[test]
    fn test_check_supported() {
        let cases: &[(Option<&'static str>, Option<&'static str>, Option<&str>)] = &[
            (Some("test/mimetype"), Some("0.1"), None),
            (
                Some("test/mimetype"),
                None,
                Some("type test/mimetype with version None is not supported"),
            ),
            (
                Some("test/mimetype"),
                Some("0.0"),
                Some("type test/mimetype with version 0.0 is not supported"),
            ),
            (
                Some("test/falsemime"),
                Some("0.1"),
                Some("type test/falsemime with version 0.1 is not supported"),
            ),
            (None, Some("0.1"), Some("None is not a supported MIME type")),
            (None, None, None),
        ];
        for (mime, version, expected) in cases {
            let mut state = ScraperState::new(args());
            state.push_stream(Box::new(CustomMeta {
                mimetype: *mime,
                version: *version,
                overrides: None,
            }));
            state.check_supported();
            match expected {
                None => assert!(state.errors().is_empty(), "{:?}", state.errors()),
                Some(msg) => assert!(
                    state.errors().iter().any(|e| e.contains(msg)),
                    "{:?}",
                    state.errors()
                ),
            }
        }
    }

    #[test]
    fn test_untyped_primary_stream() {
        let mut state = ScraperState::new(args());
        state.push_stream(Box::new(CustomMeta {
            mimetype: None,
            version: None,
            overrides: None,
        }));
        state.check_supported();
        assert!(state.errors().is_empty());

        // The same stream with a forced type now claims one.
        let mut state = ScraperState::new(args());
        state.push_stream(Box::new(CustomMeta {
            mimetype: None,
            version: None,
            overrides: Some(Overrides::new(
                Some("test/mimetype".to_string()),
                Some("0.0".to_string()),
            )),
        }));
        state.check_supported();
        assert_eq!(
            state.errors(),
            vec!["MIME type test/mimetype with version 0.0 is not supported."]
        );
    }

    #[test]
    fn test_skip_policy() {
        let mut scraper = BasicScraper::new(ScraperArgs::new("testfilename", false));
        scraper.wellformed_only = true;
        scraper.scrape_file().unwrap();
        assert!(scraper.state().streams().is_empty());
        assert_eq!(scraper.messages(), vec![SKIP_MESSAGE]);
        assert_eq!(scraper.well_formed(), None);
    }

    #[test]
    fn test_non_fatal_errors_are_recorded() {
        let mut scraper = BasicScraper::new(args());
        scraper.fail_with = Some(|| Error::tool_failed("tool", "exit status 2"));
        scraper.scrape_file().unwrap();
        assert_eq!(scraper.errors(), vec!["tool execution failed: tool: exit status 2"]);
        assert_eq!(scraper.well_formed(), Some(false));
        assert_eq!(scraper.records().len(), 1);
    }

    #[test]
    fn test_fatal_errors_propagate_after_support_check() {
        let mut scraper = BasicScraper::new(args());
        scraper.fail_with = Some(|| Error::tool_not_found("tool"));
        let err = scraper.scrape_file().unwrap_err();
        assert!(err.is_fatal());
        assert!(scraper.errors().is_empty());
    }

    #[test]
    fn test_info() {
        let mut scraper = BasicScraper::new(args());
        scraper.state.message("ok");
        let info = scraper.info();
        assert_eq!(info.class, "BasicScraper");
        assert_eq!(info.messages, vec!["ok"]);
        assert!(info.errors.is_empty());
    }
}
