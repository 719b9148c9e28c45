//! The metadata model contract.
//!
//! A metadata model is a typed view over one scraper's raw output for one
//! stream. Each model type declares a static [`Support`] table and an
//! ordered list of named accessors; [`MetadataModel::to_record`] turns the
//! accessors into a [`ModelRecord`] ready for merging.

use crate::params::{self, Params};
use crate::stream::{Entry, ModelRecord};
use crate::value::{Field, Value, UNAV};

/// Declares which MIME types and versions a model understands.
#[derive(Debug, Clone, Copy)]
pub struct Support {
    /// MIME type to explicitly supported versions.
    pub formats: &'static [(&'static str, &'static [&'static str])],
    /// Accept any version of a listed MIME type.
    pub allow_any_version: bool,
    /// Only meaningful when well-formedness checking is requested.
    pub only_wellformed: bool,
    /// Parameter that must be present and non-null.
    pub required_param: Option<&'static str>,
}

impl Support {
    /// Support table with no special flags.
    pub const fn new(formats: &'static [(&'static str, &'static [&'static str])]) -> Self {
        Self {
            formats,
            allow_any_version: false,
            only_wellformed: false,
            required_param: None,
        }
    }

    pub const fn any_version(mut self) -> Self {
        self.allow_any_version = true;
        self
    }

    pub const fn wellformed_only(mut self) -> Self {
        self.only_wellformed = true;
        self
    }

    pub const fn requires(mut self, param: &'static str) -> Self {
        self.required_param = Some(param);
        self
    }

    fn versions(&self, mimetype: &str) -> Option<&'static [&'static str]> {
        self.formats
            .iter()
            .find(|(mime, _)| *mime == mimetype)
            .map(|(_, versions)| *versions)
    }

    /// Whether the table lists the MIME type at all.
    pub fn lists(&self, mimetype: &str) -> bool {
        self.versions(mimetype).is_some()
    }

    /// Registry-level support test.
    ///
    /// An absent version, or the `(:unav)` placeholder, matches any version
    /// of a listed MIME type.
    pub fn is_supported(
        &self,
        mimetype: &str,
        version: Option<&str>,
        check_wellformed: bool,
        params: &Params,
    ) -> bool {
        let Some(versions) = self.versions(mimetype) else {
            return false;
        };
        if self.only_wellformed && !check_wellformed {
            return false;
        }
        if let Some(required) = self.required_param {
            if !params.has(required) {
                return false;
            }
        }
        match version {
            None | Some(UNAV) => true,
            Some(v) => self.allow_any_version || versions.contains(&v),
        }
    }

    /// Support test for a value a scraper actually resolved.
    ///
    /// Unlike [`Support::is_supported`] an unresolved version is not a
    /// wildcard here: only models accepting any version accept it.
    pub fn accepts_resolved(&self, mimetype: &str, version: &Value) -> bool {
        let Some(versions) = self.versions(mimetype) else {
            return false;
        };
        match version.known() {
            _ if self.allow_any_version => true,
            Some(v) => versions.contains(&v),
            None => false,
        }
    }
}

/// MIME type and version forced by the caller.
///
/// A version without a MIME type is ignored: what a version string means
/// depends on the format it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    mimetype: Option<String>,
    version: Option<String>,
}

impl Overrides {
    pub fn new(mimetype: Option<String>, version: Option<String>) -> Self {
        let mimetype = mimetype.filter(|m| !m.is_empty() && m != UNAV);
        let version = match mimetype {
            Some(_) => version.filter(|v| !v.is_empty() && v != UNAV),
            None => None,
        };
        Self { mimetype, version }
    }

    /// Read `mimetype` / `version` from the caller's parameters.
    pub fn from_params(params: &Params) -> Self {
        Self::new(
            params.get_str(params::MIMETYPE).map(str::to_string),
            params.get_str(params::VERSION).map(str::to_string),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.mimetype.is_none()
    }

    /// Message recorded by a scraper that was handed these overrides.
    pub fn message(&self) -> Option<&'static str> {
        match (&self.mimetype, &self.version) {
            (Some(_), Some(_)) => {
                Some("MIME type and version not scraped, using user-supplied values.")
            }
            (Some(_), None) => Some("MIME type not scraped, using user-supplied value."),
            _ => None,
        }
    }

    pub fn mimetype(&self, scraped: Value) -> Value {
        match &self.mimetype {
            Some(m) => Value::new(m.clone()),
            None => scraped,
        }
    }

    pub fn version(&self, scraped: Value) -> Value {
        match &self.version {
            Some(v) => Value::new(v.clone()),
            None => scraped,
        }
    }
}

/// A named accessor result, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub name: &'static str,
    pub field: Field,
    pub important: bool,
}

impl Accessor {
    pub fn new(name: &'static str, field: Field) -> Self {
        Self {
            name,
            field,
            important: false,
        }
    }

    /// An accessor whose value must win over non-important values from
    /// other scrapers.
    pub fn important(name: &'static str, field: Field) -> Self {
        Self {
            name,
            field,
            important: true,
        }
    }
}

/// A typed view over one stream of one scraper's output.
///
/// Accessors must be free of side effects and read only the model's own
/// frozen input.
pub trait MetadataModel: std::fmt::Debug + Send {
    /// The static support table of this model type.
    fn support(&self) -> &'static Support;

    /// Caller overrides. Only the primary stream's model carries any.
    fn overrides(&self) -> Option<&Overrides> {
        None
    }

    /// Stream position; `0` is the container or the file itself.
    fn index(&self) -> usize {
        0
    }

    /// MIME type as derived from the tool output.
    fn scraped_mimetype(&self) -> Value {
        Value::Unavailable
    }

    /// Version as derived from the tool output.
    fn scraped_version(&self) -> Value {
        Value::Unavailable
    }

    /// Whether the derived version must override other scrapers' versions.
    fn version_is_important(&self) -> bool {
        false
    }

    /// Additional accessors, in output order.
    fn accessors(&self) -> Vec<Accessor>;

    fn mimetype(&self) -> Value {
        match self.overrides() {
            Some(o) => o.mimetype(self.scraped_mimetype()),
            None => self.scraped_mimetype(),
        }
    }

    fn version(&self) -> Value {
        match self.overrides() {
            Some(o) => o.version(self.scraped_version()),
            None => self.scraped_version(),
        }
    }

    /// Collect every applicable accessor into a record.
    fn to_record(&self) -> ModelRecord {
        let mut entries = vec![
            Entry::new("mimetype", self.mimetype(), false),
            Entry::new("version", self.version(), self.version_is_important()),
        ];
        for accessor in self.accessors() {
            if let Field::Present(value) = accessor.field {
                entries.push(Entry::new(accessor.name, value, accessor.important));
            }
        }
        ModelRecord {
            index: self.index(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: Support = Support::new(&[("test/mimetype", &["0.1", "0.2"])]);
    const ANY: Support = Support::new(&[("test/mimetype", &[])]).any_version();
    const WELLFORMED: Support =
        Support::new(&[("test/mimetype", &["0.1", "0.2"])]).wellformed_only();
    const NEEDS_PARAM: Support = Support::new(&[("text/xml", &["1.0"])])
        .any_version()
        .requires("schematron");

    #[test]
    fn test_is_supported_table() {
        let p = Params::new();
        let cases: &[(&Support, &str, Option<&str>, bool, bool)] = &[
            (&BASIC, "test/mimetype", Some("0.1"), true, true),
            (&BASIC, "test/mimetype", None, true, true),
            (&BASIC, "test/mimetype", Some("0.1"), false, true),
            (&BASIC, "test/notsupported", Some("0.1"), true, false),
            (&BASIC, "test/mimetype", Some("X"), true, false),
            (&BASIC, "test/mimetype", Some(UNAV), true, true),
            (&ANY, "test/mimetype", Some("0.1"), true, true),
            (&ANY, "test/mimetype", None, true, true),
            (&ANY, "test/mimetype", Some("0.1"), false, true),
            (&ANY, "test/notsupported", Some("0.1"), true, false),
            (&ANY, "test/mimetype", Some("X"), true, true),
            (&WELLFORMED, "test/mimetype", Some("0.1"), true, true),
            (&WELLFORMED, "test/mimetype", None, true, true),
            (&WELLFORMED, "test/mimetype", Some("0.1"), false, false),
            (&WELLFORMED, "test/notsupported", Some("0.1"), false, false),
            (&WELLFORMED, "test/mimetype", Some("X"), true, false),
        ];
        for (support, mime, version, check, expected) in cases {
            assert_eq!(
                support.is_supported(mime, *version, *check, &p),
                *expected,
                "{mime} {version:?} check_wellformed={check}"
            );
        }
    }

    #[test]
    fn test_required_param() {
        assert!(!NEEDS_PARAM.is_supported("text/xml", Some("1.0"), true, &Params::new()));
        let null = Params::new().with("schematron", serde_json::Value::Null);
        assert!(!NEEDS_PARAM.is_supported("text/xml", Some("1.0"), true, &null));
        let given = Params::new().with("schematron", "rules.sch");
        assert!(NEEDS_PARAM.is_supported("text/xml", Some("1.0"), true, &given));
        assert!(NEEDS_PARAM.is_supported("text/xml", Some("made up"), true, &given));
    }

    #[test]
    fn test_accepts_resolved_is_strict_about_missing_versions() {
        assert!(!BASIC.accepts_resolved("test/mimetype", &Value::Unavailable));
        assert!(BASIC.accepts_resolved("test/mimetype", &Value::new("0.2")));
        assert!(ANY.accepts_resolved("test/mimetype", &Value::Unavailable));
        assert!(!ANY.accepts_resolved("test/other", &Value::Unavailable));
    }

    #[test]
    fn test_overrides() {
        let both = Overrides::new(Some("test/override".into()), Some("99.9".into()));
        assert_eq!(both.mimetype(Value::Unavailable), Value::new("test/override"));
        assert_eq!(both.version(Value::new("1.0")), Value::new("99.9"));
        assert!(both.message().unwrap().contains("using user-supplied"));

        let mime_only = Overrides::new(Some("test/override".into()), None);
        assert_eq!(mime_only.version(Value::Unavailable), Value::Unavailable);
        assert_eq!(
            mime_only.message(),
            Some("MIME type not scraped, using user-supplied value.")
        );

        let version_only = Overrides::new(None, Some("99.9".into()));
        assert!(version_only.is_empty());
        assert_eq!(version_only.version(Value::Unavailable), Value::Unavailable);
        assert_eq!(version_only.message(), None);
    }
}
