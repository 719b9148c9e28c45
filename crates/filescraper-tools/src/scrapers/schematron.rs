//! Schematron validation with `xsltproc`.
//!
//! A schematron file is compiled into an XSLT stylesheet with the ISO
//! skeleton (include, abstract expansion, SVRL generation) and the result
//! is applied to the document. Compiled stylesheets are cached under a key
//! derived from the schematron content and the `extra_hash` parameter.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use filescraper_common::{
    Accessor, Field, MetadataModel, Overrides, Result, Scraper, ScraperArgs, ScraperEntry,
    ScraperState, Support, Value,
};

use crate::command::ToolCommand;
use crate::tools::get_tool_path;
use crate::workspace::Workspace;
use crate::Error;

/// Where the ISO schematron skeleton is installed by default.
pub const DEFAULT_XSL_DIR: &str = "/usr/share/dpres-xml-schemas/schematron/schematron_xslt1";

/// Default cache for compiled schematron stylesheets.
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/filescraper/schematron";

const SUPPRESSED_MESSAGE: &str =
    "Duplicate elements in the validation output have been suppressed.";

const SCHEMATRON_SUPPORT: Support = Support::new(&[("text/xml", &[])])
    .any_version()
    .wellformed_only()
    .requires("schematron");

/// Compilation stages: skeleton stylesheet, and whether it takes the
/// SVRL output parameters.
const STAGES: &[(&str, bool)] = &[
    ("iso_dsdl_include.xsl", false),
    ("iso_abstract_expand.xsl", false),
    ("iso_svrl_for_xslt1.xsl", true),
];

/// Cache key for a schematron file.
fn cache_key(schematron: &[u8], extra_hash: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(schematron);
    if let Some(extra) = extra_hash {
        hasher.update(extra.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Drop repeated lines from SVRL output, keeping first occurrences.
/// Closing tags are always kept.
fn filter_duplicates(output: &str) -> String {
    let mut seen = HashSet::new();
    output
        .lines()
        .filter(|line| {
            let key = line.trim();
            key.is_empty() || key.starts_with("</") || seen.insert(key)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether SVRL output reports any failed assertion.
fn has_failed_asserts(svrl: &str) -> bool {
    svrl.contains("<svrl:failed-assert")
}

/// Schematron outcome. The model claims XML of any version.
#[derive(Debug, Clone)]
pub struct SchematronMeta {
    overrides: Option<Overrides>,
}

impl MetadataModel for SchematronMeta {
    fn support(&self) -> &'static Support {
        &SCHEMATRON_SUPPORT
    }

    fn overrides(&self) -> Option<&Overrides> {
        self.overrides.as_ref()
    }

    fn scraped_mimetype(&self) -> Value {
        Value::new("text/xml")
    }

    fn accessors(&self) -> Vec<Accessor> {
        vec![Accessor::new("stream_type", Field::known("text"))]
    }
}

/// Validates XML against the rules in the `schematron` parameter.
///
/// Parameters: `schematron` (path, required), `verbose` (keep duplicate
/// output, default false), `cache` (reuse compiled stylesheets, default
/// true), `extra_hash` (mixed into the cache key).
#[derive(Debug)]
pub struct SchematronScraper {
    state: ScraperState,
}

impl SchematronScraper {
    pub const ENTRY: ScraperEntry = ScraperEntry {
        name: "SchematronScraper",
        only_wellformed: true,
        metadata: &[&SCHEMATRON_SUPPORT],
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

    fn cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state.tools().schematron_cache_dir {
            return dir.clone();
        }
        let default = PathBuf::from(DEFAULT_CACHE_DIR);
        if std::fs::create_dir_all(&default).is_ok() {
            default
        } else {
            std::env::temp_dir().join("filescraper-schematron")
        }
    }

    /// Compile `schematron` into an XSLT stylesheet, reusing a cached one
    /// when allowed.
    fn compile(&self, xsltproc: &Path, schematron: &Path, use_cache: bool) -> Result<PathBuf> {
        let content = std::fs::read(schematron)?;
        let extra_hash = self.state.params().get_str("extra_hash");
        let cache_dir = self.cache_dir();
        let target = cache_dir.join(format!("{}.xsl", cache_key(&content, extra_hash)));
        if use_cache && target.is_file() {
            tracing::debug!(path = %target.display(), "using cached schematron stylesheet");
            return Ok(target);
        }

        let xsl_dir = self
            .state
            .tools()
            .schematron_xsl_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_XSL_DIR));
        let workspace = Workspace::new(schematron)?;
        let mut input = schematron.to_path_buf();
        for (i, (stylesheet, svrl)) in STAGES.iter().enumerate() {
            let out = workspace.temp_file(&format!("stage{i}.xsl"));
            let mut cmd = ToolCommand::new(xsltproc);
            cmd.arg("-o").arg(&out);
            if *svrl {
                cmd.args(["--stringparam", "allow-foreign", "true"]);
            }
            let output = cmd.arg(xsl_dir.join(stylesheet)).arg(&input).execute()?;
            if !output.success() {
                return Err(Error::tool_failed(
                    "xsltproc",
                    format!("compiling schematron failed: {}", output.stderr.trim()),
                )
                .into());
            }
            input = out;
        }

        std::fs::create_dir_all(&cache_dir)?;
        std::fs::copy(&input, &target)?;
        Ok(target)
    }
}

impl Scraper for SchematronScraper {
    fn name(&self) -> &'static str {
        "SchematronScraper"
    }

    scraper_state!();

    fn only_wellformed(&self) -> bool {
        Self::ENTRY.only_wellformed
    }

    fn run(&mut self) -> Result<()> {
        let params = self.state.params();
        let Some(schematron) = params.get_str("schematron").map(PathBuf::from) else {
            self.state.error("Schematron file missing from parameters.");
            return Ok(());
        };
        let verbose = params.get_bool("verbose")?.unwrap_or(false);
        let use_cache = params.get_bool("cache")?.unwrap_or(true);

        let xsltproc = get_tool_path("xsltproc", self.state.tools())?;
        let stylesheet = self.compile(&xsltproc, &schematron, use_cache)?;

        let output = ToolCommand::new(&xsltproc)
            .arg(&stylesheet)
            .arg(self.state.path())
            .execute()?;

        if !output.success() || output.stdout.trim().is_empty() {
            self.state.error(output.stderr.trim());
        } else if has_failed_asserts(&output.stdout) {
            self.state.error(output.stdout.trim());
        }

        if verbose {
            self.state.message(output.stdout.trim());
        } else {
            self.state.message(filter_duplicates(output.stdout.trim()));
            self.state.message(SUPPRESSED_MESSAGE);
        }

        let overrides = Some(self.state.overrides().clone());
        self.state
            .push_stream(Box::new(SchematronMeta { overrides }));
        Ok(())
    }
}
