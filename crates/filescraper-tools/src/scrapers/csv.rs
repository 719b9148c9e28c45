//! CSV well-formedness and dialect metadata, read in-process.

use std::fmt;

use filescraper_common::{
    Accessor, Field, MetadataModel, Overrides, Result, Scraper, ScraperArgs, ScraperEntry,
    ScraperState, Support, Value,
};

const CSV_SUPPORT: Support = Support::new(&[("text/csv", &[])]).any_version();

const SNIFF_LEN: usize = 1024;
const CANDIDATES: &[char] = &[',', ';', '\t', '|'];

/// A parse failure at a 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CsvError {
    line: usize,
    message: String,
}

impl CsvError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for CsvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CSV error on line {}: {}", self.line, self.message)
    }
}

/// Count `delimiter` outside quoted sections of one line.
fn count_outside_quotes(line: &str, delimiter: char) -> usize {
    let mut quoted = false;
    let mut count = 0;
    for c in line.chars() {
        if c == '"' {
            quoted = !quoted;
        } else if c == delimiter && !quoted {
            count += 1;
        }
    }
    count
}

fn head(text: &str) -> &str {
    match text.char_indices().nth(SNIFF_LEN) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Guess the delimiter from the start of the file.
///
/// The delimiter is the candidate occurring the same, non-zero number of
/// times on every complete line of the sample. Failing that, the candidate
/// most frequent on the first line.
fn sniff_delimiter(text: &str) -> std::result::Result<char, CsvError> {
    let sample = head(text);
    let mut lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    if sample.len() < text.len() && lines.len() > 1 {
        lines.pop();
    }
    let Some(first) = lines.first() else {
        return Err(CsvError::new(0, "Could not determine delimiter"));
    };

    let consistent = CANDIDATES.iter().copied().find(|&d| {
        let n = count_outside_quotes(first, d);
        n > 0 && lines.iter().all(|l| count_outside_quotes(l, d) == n)
    });
    consistent
        .or_else(|| {
            CANDIDATES
                .iter()
                .copied()
                .map(|d| (d, count_outside_quotes(first, d)))
                .filter(|(_, n)| *n > 0)
                .max_by_key(|(_, n)| *n)
                .map(|(d, _)| d)
        })
        .ok_or_else(|| CsvError::new(0, "Could not determine delimiter"))
}

/// The first kind of line terminator in the sample, `\r\n` when there is
/// none.
fn line_terminator(text: &str) -> &'static str {
    let sample = head(text);
    if sample.contains("\r\n") {
        "\r\n"
    } else if sample.contains('\n') {
        "\n"
    } else if sample.contains('\r') {
        "\r"
    } else {
        "\r\n"
    }
}

/// Strict CSV reader. Quoted fields may span lines and escape quotes by
/// doubling them; a closing quote must be followed by a delimiter or the
/// end of the record. Blank lines are skipped.
fn read_records(text: &str, delimiter: char) -> std::result::Result<Vec<Vec<String>>, CsvError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut line = 1;
    let mut at_field_start = true;
    let mut line_has_content = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if at_field_start && c == '"' {
            line_has_content = true;
            loop {
                match chars.next() {
                    None => return Err(CsvError::new(line, "unexpected end of data")),
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    Some('"') => break,
                    Some(inner) => {
                        if inner == '\n' {
                            line += 1;
                        }
                        field.push(inner);
                    }
                }
            }
            match chars.peek() {
                None | Some('\n') | Some('\r') => {}
                Some(&next) if next == delimiter => {}
                Some(_) => {
                    return Err(CsvError::new(
                        line,
                        format!("'{delimiter}' expected after '\"'"),
                    ))
                }
            }
            at_field_start = false;
            continue;
        }

        match c {
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if line_has_content {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                line += 1;
                at_field_start = true;
                line_has_content = false;
            }
            c if c == delimiter => {
                record.push(std::mem::take(&mut field));
                at_field_start = true;
                line_has_content = true;
            }
            c => {
                field.push(c);
                at_field_start = false;
                line_has_content = true;
            }
        }
    }
    if line_has_content {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

/// CSV dialect and header.
#[derive(Debug, Clone)]
pub struct CsvMeta {
    delimiter: Option<String>,
    separator: Option<String>,
    first_line: Option<Vec<String>>,
    overrides: Option<Overrides>,
}

impl CsvMeta {
    pub fn delimiter(&self) -> Field {
        Value::from_option(self.delimiter.clone()).into()
    }

    pub fn separator(&self) -> Field {
        Value::from_option(self.separator.clone()).into()
    }

    /// Header fields joined with the delimiter.
    pub fn first_line(&self) -> Field {
        let delimiter = self.delimiter.as_deref().unwrap_or(",");
        let joined = self.first_line.as_ref().map(|fields| fields.join(delimiter));
        Value::from_option(joined).into()
    }
}

impl MetadataModel for CsvMeta {
    fn support(&self) -> &'static Support {
        &CSV_SUPPORT
    }

    fn overrides(&self) -> Option<&Overrides> {
        self.overrides.as_ref()
    }

    fn scraped_mimetype(&self) -> Value {
        Value::new("text/csv")
    }

    fn accessors(&self) -> Vec<Accessor> {
        vec![
            Accessor::new("delimiter", self.delimiter()),
            Accessor::new("separator", self.separator()),
            Accessor::new("first_line", self.first_line()),
            Accessor::new("stream_type", Field::known("text")),
        ]
    }
}

/// CSV scraper.
///
/// Parameters: `delimiter` replaces the sniffed delimiter, `separator` the
/// reported line terminator (records are split on any terminator either
/// way), and `fields` is the expected header whose length must match the
/// first row.
#[derive(Debug)]
pub struct CsvScraper {
    state: ScraperState,
}

impl CsvScraper {
    pub const ENTRY: ScraperEntry = ScraperEntry {
        name: "CsvScraper",
        only_wellformed: false,
        metadata: &[&CSV_SUPPORT],
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

    /// Validate `text`, filling `meta` with whatever was determined before
    /// a failure.
    fn check(&mut self, text: &str, fields: &[String], meta: &mut CsvMeta) {
        if meta.separator.is_none() {
            meta.separator = Some(line_terminator(text).to_string());
        }
        let delimiter = match meta.delimiter.clone() {
            Some(given) => given,
            None => match sniff_delimiter(text) {
                Ok(sniffed) => meta.delimiter.insert(sniffed.to_string()).clone(),
                Err(e) => {
                    self.state.error(e.to_string());
                    return;
                }
            },
        };

        let mut chars = delimiter.chars();
        let (Some(delim), None) = (chars.next(), chars.next()) else {
            self.state.error(format!(
                "CSV error on line 0: delimiter must be a single character, got '{delimiter}'"
            ));
            return;
        };

        match read_records(text, delim) {
            Ok(records) => {
                meta.first_line = records.into_iter().next();
                let header_len = meta.first_line.as_ref().map_or(0, Vec::len);
                if !fields.is_empty() && fields.len() != header_len {
                    self.state.error(
                        "CSV validation error: field counts in the given header parameter \
                         and the CSV header don't match.",
                    );
                    return;
                }
                self.state.message("CSV file was scraped successfully.");
            }
            Err(e) => self.state.error(e.to_string()),
        }
    }
}

impl Scraper for CsvScraper {
    fn name(&self) -> &'static str {
        "CsvScraper"
    }

    scraper_state!();

    fn run(&mut self) -> Result<()> {
        let params = self.state.params();
        let mut meta = CsvMeta {
            delimiter: params.get_str("delimiter").map(str::to_string),
            separator: params.get_str("separator").map(str::to_string),
            first_line: None,
            overrides: Some(self.state.overrides().clone()),
        };
        let fields = params.get_list("fields")?.unwrap_or_default();

        let bytes = std::fs::read(self.state.path())?;
        match String::from_utf8(bytes) {
            Ok(text) => self.check(&text, &fields, &mut meta),
            Err(e) => self.state.error(format!("CSV error on line 0: {e}")),
        }

        self.state.push_stream(Box::new(meta));
        Ok(())
    }
}
