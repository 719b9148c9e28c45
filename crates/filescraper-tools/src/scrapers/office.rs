//! Office document validation by conversion with LibreOffice.
//!
//! A document that LibreOffice can convert to PDF is considered
//! well-formed. The converted file is thrown away with the workspace.

use filescraper_common::{
    Accessor, Field, MetadataModel, Overrides, Result, Scraper, ScraperArgs, ScraperEntry,
    ScraperState, Support,
};

use crate::command::ToolCommand;
use crate::tools::get_tool_path;
use crate::workspace::Workspace;

const OFFICE_SUPPORT: Support = Support::new(&[
    ("application/vnd.oasis.opendocument.text", &["1.0", "1.1", "1.2"]),
    ("application/vnd.oasis.opendocument.spreadsheet", &["1.0", "1.1", "1.2"]),
    ("application/vnd.oasis.opendocument.presentation", &["1.0", "1.1", "1.2"]),
    ("application/vnd.oasis.opendocument.graphics", &["1.0", "1.1", "1.2"]),
    ("application/vnd.oasis.opendocument.formula", &["1.0", "1.2"]),
    ("application/msword", &["8.0", "8.5", "9.0", "10.0", "11.0"]),
    ("application/vnd.ms-excel", &["8.0", "9.0", "10.0", "11.0"]),
    ("application/vnd.ms-powerpoint", &["8.0", "9.0", "10.0", "11.0"]),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &["12.0", "14.0", "15.0"],
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &["12.0", "14.0", "15.0"],
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        &["12.0", "14.0", "15.0"],
    ),
])
.any_version()
.wellformed_only();

/// Conversion only proves the document loads; it reports no format.
#[derive(Debug, Clone)]
pub struct OfficeMeta {
    overrides: Option<Overrides>,
}

impl MetadataModel for OfficeMeta {
    fn support(&self) -> &'static Support {
        &OFFICE_SUPPORT
    }

    fn overrides(&self) -> Option<&Overrides> {
        self.overrides.as_ref()
    }

    fn accessors(&self) -> Vec<Accessor> {
        vec![Accessor::new("stream_type", Field::known("binary"))]
    }
}

/// Office scraper running `soffice --convert-to pdf`.
#[derive(Debug)]
pub struct OfficeScraper {
    state: ScraperState,
}

impl OfficeScraper {
    pub const ENTRY: ScraperEntry = ScraperEntry {
        name: "OfficeScraper",
        only_wellformed: true,
        metadata: &[&OFFICE_SUPPORT],
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
}

impl Scraper for OfficeScraper {
    fn name(&self) -> &'static str {
        "OfficeScraper"
    }

    scraper_state!();

    fn only_wellformed(&self) -> bool {
        Self::ENTRY.only_wellformed
    }

    fn run(&mut self) -> Result<()> {
        let soffice = get_tool_path("soffice", self.state.tools())?;
        let workspace = Workspace::new(self.state.path())?;

        // A private profile keeps concurrent conversions from fighting over
        // the user's LibreOffice lock.
        let profile = format!(
            "-env:UserInstallation=file://{}",
            workspace.temp_file("profile").display()
        );
        let output = ToolCommand::new(soffice)
            .arg(profile)
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(workspace.temp_dir())
            .arg(self.state.path())
            .execute()?;

        let stderr = output.stderr.trim();
        if !output.success() || stderr.contains("Error") {
            self.state.error(stderr);
        } else if !workspace.converted("pdf").is_file() {
            self.state
                .error("Conversion produced no output: source file could not be loaded");
        } else {
            self.state.message(output.stdout.trim());
        }

        let overrides = Some(self.state.overrides().clone());
        self.state.push_stream(Box::new(OfficeMeta { overrides }));
        Ok(())
    }
}
