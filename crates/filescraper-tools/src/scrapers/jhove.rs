//! Validation with JHOVE.
//!
//! One scraper type serves every JHOVE module; the module decides the
//! support table and how the reported version is normalised.

use serde::Deserialize;
use serde_json::Value as Json;

use filescraper_common::{
    Accessor, Field, MetadataModel, Overrides, Result, Scraper, ScraperArgs, ScraperEntry,
    ScraperState, Support, Value,
};

use crate::command::ToolCommand;
use crate::tools::get_tool_path;

const VALID_STATUS: &str = "Well-Formed and valid";

const GIF_SUPPORT: Support =
    Support::new(&[("image/gif", &["1987a", "1989a"])]).wellformed_only();
const HTML_SUPPORT: Support = Support::new(&[
    ("text/html", &["4.01"]),
    ("application/xhtml+xml", &["1.0", "1.1"]),
])
.wellformed_only();
const JPEG_SUPPORT: Support = Support::new(&[(
    "image/jpeg",
    &["1.00", "1.01", "1.02", "2.0", "2.1", "2.2", "2.2.1"],
)])
.wellformed_only();
const TIFF_SUPPORT: Support = Support::new(&[("image/tiff", &["6.0"])]).wellformed_only();
const PDF_SUPPORT: Support = Support::new(&[(
    "application/pdf",
    &[
        "1.2", "1.3", "1.4", "1.5", "1.6", "1.7", "A-1a", "A-1b", "A-2a", "A-2b", "A-2u",
        "A-3a", "A-3b", "A-3u",
    ],
)])
.wellformed_only();
const WAV_SUPPORT: Support = Support::new(&[("audio/x-wav", &["2"])])
    .any_version()
    .wellformed_only();
const UTF8_SUPPORT: Support = Support::new(&[
    ("text/plain", &[]),
    ("text/csv", &[]),
    ("text/html", &[]),
    ("text/xml", &[]),
    ("application/xhtml+xml", &[]),
])
.any_version()
.wellformed_only();

/// A JHOVE module and how its report maps onto a model.
#[derive(Debug)]
pub struct JHoveModule {
    pub class: &'static str,
    pub module: &'static str,
    pub support: &'static Support,
    kind: Kind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Gif,
    Html,
    Jpeg,
    Tiff,
    Pdf,
    Wav,
    Utf8,
}

impl Kind {
    fn stream_type(self) -> &'static str {
        match self {
            Kind::Gif | Kind::Jpeg | Kind::Tiff => "image",
            Kind::Html | Kind::Utf8 => "text",
            Kind::Pdf => "binary",
            Kind::Wav => "audio",
        }
    }
}

const GIF_MODULE: JHoveModule = JHoveModule {
    class: "JHoveGifScraper",
    module: "GIF-hul",
    support: &GIF_SUPPORT,
    kind: Kind::Gif,
};
const HTML_MODULE: JHoveModule = JHoveModule {
    class: "JHoveHtmlScraper",
    module: "HTML-hul",
    support: &HTML_SUPPORT,
    kind: Kind::Html,
};
const JPEG_MODULE: JHoveModule = JHoveModule {
    class: "JHoveJpegScraper",
    module: "JPEG-hul",
    support: &JPEG_SUPPORT,
    kind: Kind::Jpeg,
};
const TIFF_MODULE: JHoveModule = JHoveModule {
    class: "JHoveTiffScraper",
    module: "TIFF-hul",
    support: &TIFF_SUPPORT,
    kind: Kind::Tiff,
};
const PDF_MODULE: JHoveModule = JHoveModule {
    class: "JHovePdfScraper",
    module: "PDF-hul",
    support: &PDF_SUPPORT,
    kind: Kind::Pdf,
};
const WAV_MODULE: JHoveModule = JHoveModule {
    class: "JHoveWavScraper",
    module: "WAVE-hul",
    support: &WAV_SUPPORT,
    kind: Kind::Wav,
};
const UTF8_MODULE: JHoveModule = JHoveModule {
    class: "JHoveUtf8Scraper",
    module: "UTF8-hul",
    support: &UTF8_SUPPORT,
    kind: Kind::Utf8,
};

#[derive(Debug, Deserialize)]
struct JhoveOutput {
    jhove: JhoveRoot,
}

#[derive(Debug, Deserialize)]
struct JhoveRoot {
    #[serde(rename = "repInfo", default)]
    rep_info: Vec<RepInfo>,
}

/// The per-file section of a JHOVE JSON report.
#[derive(Debug, Clone, Default, Deserialize)]
struct RepInfo {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "mimeType", default)]
    mime_type: Option<String>,
    #[serde(default)]
    profiles: Vec<String>,
    #[serde(default)]
    properties: Json,
}

/// Find a named property anywhere in JHOVE's nested property tree.
///
/// Properties appear both as `{"Name": value}` maps and as
/// `{"name": "Name", "values": ...}` records.
fn find_property(tree: &Json, name: &str) -> Option<String> {
    match tree {
        Json::Object(map) => {
            if let Some(found) = map.get(name).and_then(first_string) {
                return Some(found);
            }
            if map.get("name").and_then(Json::as_str) == Some(name) {
                if let Some(found) = map.get("values").and_then(first_string) {
                    return Some(found);
                }
            }
            map.values().find_map(|v| find_property(v, name))
        }
        Json::Array(items) => items.iter().find_map(|v| find_property(v, name)),
        _ => None,
    }
}

fn first_string(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Array(items) => items.iter().find_map(first_string),
        Json::Object(map) => map.values().find_map(first_string),
        _ => None,
    }
}

/// Metadata derived from one JHOVE report.
#[derive(Debug, Clone)]
pub struct JHoveMeta {
    module: &'static JHoveModule,
    info: RepInfo,
    overrides: Option<Overrides>,
}

impl JHoveMeta {
    fn status_is_valid(&self) -> bool {
        self.info.status.as_deref() == Some(VALID_STATUS)
    }
}

impl MetadataModel for JHoveMeta {
    fn support(&self) -> &'static Support {
        self.module.support
    }

    fn overrides(&self) -> Option<&Overrides> {
        self.overrides.as_ref()
    }

    fn scraped_mimetype(&self) -> Value {
        match self.module.kind {
            // The UTF-8 module only vouches for the encoding.
            Kind::Utf8 => Value::Unavailable,
            Kind::Tiff => Value::new("image/tiff"),
            _ => Value::from_option(self.info.mime_type.clone().filter(|m| !m.is_empty())),
        }
    }

    fn scraped_version(&self) -> Value {
        let reported = self.info.version.as_deref().filter(|v| !v.is_empty());
        match self.module.kind {
            Kind::Utf8 => Value::Unavailable,
            Kind::Gif => Value::from_option(reported.map(|v| format!("19{v}"))),
            Kind::Html => Value::from_option(
                reported.and_then(|v| v.split_whitespace().last()).map(str::to_string),
            ),
            // Every TIFF revision is read as the 6.0 baseline.
            Kind::Tiff => Value::new("6.0"),
            Kind::Wav => {
                if self.info.profiles.iter().any(|p| p.contains("BWF")) {
                    Value::new("2")
                } else {
                    Value::Unavailable
                }
            }
            Kind::Jpeg | Kind::Pdf => Value::from_option(reported.map(str::to_string)),
        }
    }

    fn accessors(&self) -> Vec<Accessor> {
        let charset = match self.module.kind {
            Kind::Utf8 if self.status_is_valid() => Field::known("UTF-8"),
            Kind::Utf8 => Field::unavailable(),
            Kind::Html => Field::Present(Value::from_option(
                find_property(&self.info.properties, "Charset")
                    .map(|c| c.to_uppercase()),
            )),
            _ => Field::NotApplicable,
        };
        vec![
            Accessor::new("charset", charset),
            Accessor::new("stream_type", Field::known(self.module.kind.stream_type())),
        ]
    }
}

/// Scraper running a single JHOVE module.
#[derive(Debug)]
pub struct JHoveScraper {
    state: ScraperState,
    module: &'static JHoveModule,
}

macro_rules! jhove_entry {
    ($entry:ident, $module:ident, $build:ident) => {
        pub const $entry: ScraperEntry = ScraperEntry {
            name: $module.class,
            only_wellformed: Self::ONLY_WELLFORMED,
            metadata: &[$module.support],
            build: Self::$build,
        };

        fn $build(args: ScraperArgs) -> Box<dyn Scraper> {
            Box::new(Self::new(args, &$module))
        }
    };
}

impl JHoveScraper {
    /// Every JHOVE module only validates.
    const ONLY_WELLFORMED: bool = true;

    jhove_entry!(GIF, GIF_MODULE, build_gif);
    jhove_entry!(HTML, HTML_MODULE, build_html);
    jhove_entry!(JPEG, JPEG_MODULE, build_jpeg);
    jhove_entry!(TIFF, TIFF_MODULE, build_tiff);
    jhove_entry!(PDF, PDF_MODULE, build_pdf);
    jhove_entry!(WAV, WAV_MODULE, build_wav);
    jhove_entry!(UTF8, UTF8_MODULE, build_utf8);

    pub fn new(args: ScraperArgs, module: &'static JHoveModule) -> Self {
        Self {
            state: ScraperState::new(args),
            module,
        }
    }

    /// Record the report's verdict and stream, if the module understands
    /// the reported MIME type.
    fn interpret(&mut self, stdout: &str, stderr: &str) {
        let info = match serde_json::from_str::<JhoveOutput>(stdout) {
            Ok(output) => output.jhove.rep_info.into_iter().next().unwrap_or_default(),
            Err(e) => {
                self.state
                    .error(format!("JHove output could not be parsed: {e}"));
                return;
            }
        };

        let status = info.status.clone().unwrap_or_default();
        self.state.message(status.clone());
        if !status.contains(VALID_STATUS) {
            self.state.error(format!(
                "Validator returned error: {}\n{}",
                stdout.trim(),
                stderr.trim()
            ));
        }

        let accepts = match self.module.kind {
            Kind::Utf8 => true,
            _ => info
                .mime_type
                .as_deref()
                .is_some_and(|m| self.module.support.lists(m)),
        };
        if accepts {
            let overrides = Some(self.state.overrides().clone());
            self.state.push_stream(Box::new(JHoveMeta {
                module: self.module,
                info,
                overrides,
            }));
        } else {
            tracing::debug!(
                module = self.module.module,
                format = ?info.format,
                mimetype = ?info.mime_type,
                "JHOVE reported a MIME type outside the module's table"
            );
        }
    }
}

impl Scraper for JHoveScraper {
    fn name(&self) -> &'static str {
        self.module.class
    }

    scraper_state!();

    fn only_wellformed(&self) -> bool {
        Self::ONLY_WELLFORMED
    }

    fn run(&mut self) -> Result<()> {
        let jhove = get_tool_path("jhove", self.state.tools())?;
        let output = ToolCommand::new(jhove)
            .args(["-h", "JSON", "-m", self.module.module])
            .arg(self.state.path())
            .execute()?;

        if !output.success() {
            self.state.error(format!(
                "JHove returned error: {}\n{}",
                output.code(),
                output.stderr.trim()
            ));
        }
        self.interpret(&output.stdout, &output.stderr);
        Ok(())
    }
}
