//! PDF/A validation with veraPDF.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use filescraper_common::{
    Accessor, Field, MetadataModel, Overrides, Result, Scraper, ScraperArgs, ScraperEntry,
    ScraperState, Support, Value,
};

use crate::command::ToolCommand;
use crate::tools::get_tool_path;
use crate::Error;

static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Za-z_:][\w:.-]*)\s*=\s*"([^"]*)""#).unwrap());

const VERAPDF_SUPPORT: Support = Support::new(&[(
    "application/pdf",
    &["A-1a", "A-1b", "A-2a", "A-2b", "A-2u", "A-3a", "A-3b", "A-3u"],
)])
.wellformed_only();

/// Attributes of the first `<tag ...>` element in an XML report.
fn element_attributes(report: &str, tag: &str) -> Option<BTreeMap<String, String>> {
    let open = format!("<{tag}");
    let start = report
        .match_indices(&open)
        .map(|(i, _)| i)
        .find(|&i| {
            report[i + open.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_whitespace() || c == '>' || c == '/')
        })?;
    let end = report[start..].find('>')? + start;
    let element = &report[start + open.len()..end];
    Some(
        ATTRIBUTE
            .captures_iter(element)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect(),
    )
}

/// `"PDF/A-1B validation profile"` as `"A-1b"`.
fn profile_version(profile: &str) -> Option<String> {
    let (_, rest) = profile.split_once("PDF/A")?;
    let part = rest.split(" validation profile").next().unwrap_or(rest);
    Some(format!("A{}", part.to_lowercase()))
}

/// PDF/A metadata from a compliant veraPDF report.
#[derive(Debug, Clone)]
pub struct VerapdfMeta {
    profile: String,
    overrides: Option<Overrides>,
}

impl MetadataModel for VerapdfMeta {
    fn support(&self) -> &'static Support {
        &VERAPDF_SUPPORT
    }

    fn overrides(&self) -> Option<&Overrides> {
        self.overrides.as_ref()
    }

    fn scraped_mimetype(&self) -> Value {
        Value::new("application/pdf")
    }

    /// For files that are not PDF/A, other scrapers determine the version.
    fn scraped_version(&self) -> Value {
        Value::from_option(profile_version(&self.profile))
    }

    fn version_is_important(&self) -> bool {
        true
    }

    fn accessors(&self) -> Vec<Accessor> {
        vec![Accessor::new("stream_type", Field::known("binary"))]
    }
}

/// PDF/A validator.
#[derive(Debug)]
pub struct VerapdfScraper {
    state: ScraperState,
}

impl VerapdfScraper {
    pub const ENTRY: ScraperEntry = ScraperEntry {
        name: "VerapdfScraper",
        only_wellformed: true,
        metadata: &[&VERAPDF_SUPPORT],
        build: Self::boxed,
    };

    pub fn new(args: ScraperArgs) -> Self {
        Self {
            state: ScraperState::new(args),
        }
    }

    fn boxed(args: ScraperArgs) -> Box<dyn Scraper> {
        Box::new(Self::new(args))
    }

    fn interpret(&mut self, stdout: &str, stderr: &str) {
        self.state.message(stdout.trim());

        let Some(summary) = element_attributes(stdout, "batchSummary") else {
            self.state.error(stderr.trim());
            return;
        };
        if summary.get("failedToParse").map(String::as_str) != Some("0") {
            self.state.error(stdout.trim());
            return;
        }

        let report = element_attributes(stdout, "validationReport").unwrap_or_default();
        if report.get("isCompliant").map(String::as_str) == Some("false") {
            self.state.error(stdout.trim());
        }

        if self.state.well_formed() == Some(true) {
            let profile = report.get("profileName").cloned().unwrap_or_default();
            let overrides = Some(self.state.overrides().clone());
            self.state
                .push_stream(Box::new(VerapdfMeta { profile, overrides }));
        }
    }
}

impl Scraper for VerapdfScraper {
    fn name(&self) -> &'static str {
        "VerapdfScraper"
    }

    scraper_state!();

    fn only_wellformed(&self) -> bool {
        Self::ENTRY.only_wellformed
    }

    fn run(&mut self) -> Result<()> {
        let verapdf = get_tool_path("verapdf", self.state.tools())?;
        let output = ToolCommand::new(verapdf).arg(self.state.path()).execute()?;
        if !output.success() {
            return Err(Error::tool_failed("verapdf", output.stderr.trim()).into());
        }
        self.interpret(&output.stdout, &output.stderr);
        Ok(())
    }
}
