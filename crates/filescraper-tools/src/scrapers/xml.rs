//! XML well-formedness with `xmllint`, and declared encodings of XML and
//! HTML5 documents.

use regex::Regex;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use filescraper_common::{
    Accessor, Field, MetadataModel, Overrides, Result, Scraper, ScraperArgs, ScraperEntry,
    ScraperState, Support, Value,
};

use crate::command::ToolCommand;
use crate::tools::get_tool_path;

static XML_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*<\?xml\s[^>]*\?>"#).unwrap());
static DECLARED_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"version\s*=\s*["']([0-9.]+)["']"#).unwrap());
static DECLARED_ENCODING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"encoding\s*=\s*["']([A-Za-z0-9._-]+)["']"#).unwrap());
static HTML5_DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*<!DOCTYPE\s+html\s*>").unwrap());
static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*charset\s*=\s*["']?([A-Za-z0-9._-]+)"#).unwrap()
});

/// How much of the file is read to find a declaration.
const HEAD_BYTES: u64 = 4096;

const XMLLINT_SUPPORT: Support = Support::new(&[("text/xml", &["1.0"])]);
const ENCODING_SUPPORT: Support =
    Support::new(&[("text/xml", &["1.0"]), ("text/html", &["5.0"])]).wellformed_only();

/// The leading bytes of a file as (lossy) text.
fn read_head(path: &Path) -> std::io::Result<String> {
    let mut head = Vec::new();
    std::fs::File::open(path)?
        .take(HEAD_BYTES)
        .read_to_end(&mut head)?;
    let head = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&head);
    Ok(String::from_utf8_lossy(head).into_owned())
}

/// What the head of a document declares about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Declaration {
    version: Option<String>,
    charset: Option<String>,
}

/// XML version and encoding from the prolog.
///
/// Without an explicit encoding XML defaults to UTF-8, and without a
/// declaration at all to version 1.0.
fn xml_declaration(head: &str) -> Declaration {
    let Some(prolog) = XML_DECLARATION.find(head) else {
        return Declaration {
            version: Some("1.0".to_string()),
            charset: Some("UTF-8".to_string()),
        };
    };
    let prolog = prolog.as_str();
    Declaration {
        version: DECLARED_VERSION
            .captures(prolog)
            .map(|c| c[1].to_string())
            .or_else(|| Some("1.0".to_string())),
        charset: DECLARED_ENCODING
            .captures(prolog)
            .map(|c| c[1].to_uppercase())
            .or_else(|| Some("UTF-8".to_string())),
    }
}

/// HTML5 doctype and `<meta charset>` from the head of an HTML document.
fn html_declaration(head: &str) -> Declaration {
    Declaration {
        version: HTML5_DOCTYPE.is_match(head).then(|| "5.0".to_string()),
        charset: META_CHARSET.captures(head).map(|c| c[1].to_uppercase()),
    }
}

/// Metadata for a document xmllint accepted as XML.
#[derive(Debug, Clone)]
pub struct XmllintMeta {
    version: Option<String>,
    overrides: Option<Overrides>,
}

impl MetadataModel for XmllintMeta {
    fn support(&self) -> &'static Support {
        &XMLLINT_SUPPORT
    }

    fn overrides(&self) -> Option<&Overrides> {
        self.overrides.as_ref()
    }

    fn scraped_mimetype(&self) -> Value {
        Value::new("text/xml")
    }

    fn scraped_version(&self) -> Value {
        Value::from_option(self.version.clone())
    }

    fn accessors(&self) -> Vec<Accessor> {
        vec![Accessor::new("stream_type", Field::known("text"))]
    }
}

/// XML well-formedness, and schema validation when a `schema` parameter
/// is given.
#[derive(Debug)]
pub struct XmllintScraper {
    state: ScraperState,
}

impl XmllintScraper {
    pub const ENTRY: ScraperEntry = ScraperEntry {
        name: "XmllintScraper",
        only_wellformed: false,
        metadata: &[&XMLLINT_SUPPORT],
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

impl Scraper for XmllintScraper {
    fn name(&self) -> &'static str {
        "XmllintScraper"
    }

    scraper_state!();

    fn run(&mut self) -> Result<()> {
        let xmllint = get_tool_path("xmllint", self.state.tools())?;
        let path = self.state.path().to_path_buf();

        let mut cmd = ToolCommand::new(xmllint);
        cmd.args(["--noout", "--nonet"]);
        let schema = self.state.params().get_str("schema").map(str::to_string);
        if let (true, Some(schema)) = (self.state.check_wellformed(), &schema) {
            cmd.args(["--schema", schema.as_str()]);
        }
        let output = cmd.arg(&path).execute()?;

        if output.success() {
            match &schema {
                Some(_) if self.state.check_wellformed() => {
                    self.state.message(format!("{} validates", path.display()))
                }
                _ => self.state.message("Document is well-formed."),
            }
        } else {
            self.state.error(format!(
                "Validation failed: returned error code {}",
                output.code()
            ));
            self.state.error(output.stderr.trim());
        }

        let version = read_head(&path)
            .ok()
            .and_then(|head| xml_declaration(&head).version);
        let overrides = Some(self.state.overrides().clone());
        self.state
            .push_stream(Box::new(XmllintMeta { version, overrides }));
        Ok(())
    }
}

/// Declared character encoding of an XML or HTML5 document.
#[derive(Debug, Clone)]
pub struct XmlEncodingMeta {
    mimetype: Option<String>,
    declaration: Declaration,
    overrides: Option<Overrides>,
}

impl MetadataModel for XmlEncodingMeta {
    fn support(&self) -> &'static Support {
        &ENCODING_SUPPORT
    }

    fn overrides(&self) -> Option<&Overrides> {
        self.overrides.as_ref()
    }

    fn scraped_mimetype(&self) -> Value {
        Value::from_option(self.mimetype.clone())
    }

    fn scraped_version(&self) -> Value {
        Value::from_option(self.declaration.version.clone())
    }

    fn accessors(&self) -> Vec<Accessor> {
        vec![
            Accessor::new(
                "charset",
                Field::Present(Value::from_option(self.declaration.charset.clone())),
            ),
            Accessor::new("stream_type", Field::known("text")),
        ]
    }
}

/// Reads the encoding an XML prolog or HTML5 header declares.
#[derive(Debug)]
pub struct XmlEncodingScraper {
    state: ScraperState,
}

impl XmlEncodingScraper {
    pub const ENTRY: ScraperEntry = ScraperEntry {
        name: "XmlEncodingScraper",
        only_wellformed: true,
        metadata: &[&ENCODING_SUPPORT],
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

impl Scraper for XmlEncodingScraper {
    fn name(&self) -> &'static str {
        "XmlEncodingScraper"
    }

    scraper_state!();

    fn only_wellformed(&self) -> bool {
        Self::ENTRY.only_wellformed
    }

    fn run(&mut self) -> Result<()> {
        let head = read_head(self.state.path())?;
        let mimetype = self
            .state
            .overrides()
            .mimetype(Value::from_option(self.state.predicted_mimetype()))
            .known()
            .map(str::to_string);

        let declaration = match mimetype.as_deref() {
            Some("text/html") => html_declaration(&head),
            _ => xml_declaration(&head),
        };
        match &declaration.charset {
            Some(charset) => self
                .state
                .message(format!("Declared character encoding is {charset}.")),
            None => self
                .state
                .error("No character encoding declared in the document header."),
        }

        let overrides = Some(self.state.overrides().clone());
        self.state.push_stream(Box::new(XmlEncodingMeta {
            mimetype,
            declaration,
            overrides,
        }));
        Ok(())
    }
}
