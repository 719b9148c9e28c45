//! Stream records and the multi-source merge rule.
//!
//! Every scraper contributes zero or more [`ModelRecord`]s, each tagged with
//! the stream index it describes. [`merge_streams`] overlays them into one
//! [`StreamRecord`] per index:
//!
//! - a missing value never replaces a present one,
//! - a present value fills a missing one,
//! - between two present values the first one written stays, unless the
//!   later one is flagged important and the earlier one is not.
//!
//! Disagreements that the rules above silently settle are reported back as
//! conflicts so they can be surfaced to the caller.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

use crate::value::Value;

/// One accessor result inside a [`ModelRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub value: Value,
    pub important: bool,
}

impl Entry {
    pub fn new(name: impl Into<String>, value: Value, important: bool) -> Self {
        Self {
            name: name.into(),
            value,
            important,
        }
    }
}

/// The output of one metadata model for one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRecord {
    pub index: usize,
    pub entries: Vec<Entry>,
}

/// Ordered attribute mapping for one logical stream.
///
/// Keys keep the order in which they were first written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamRecord {
    fields: Vec<(String, Value)>,
}

impl StreamRecord {
    /// A record holding only the mandatory `mimetype` and `version` keys.
    pub fn new() -> Self {
        Self {
            fields: vec![
                ("mimetype".to_string(), Value::Unavailable),
                ("version".to_string(), Value::Unavailable),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Insert or replace a field, keeping its original position.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn mimetype(&self) -> &Value {
        self.get("mimetype").unwrap_or(&Value::Unavailable)
    }

    pub fn version(&self) -> &Value {
        self.get("version").unwrap_or(&Value::Unavailable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for StreamRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Merged streams keyed by stream index.
pub type StreamSet = BTreeMap<usize, StreamRecord>;

/// Result of folding scraper outputs together.
#[derive(Debug, Clone, Default)]
pub struct Merged {
    pub streams: StreamSet,
    pub conflicts: Vec<String>,
}

/// Incremental merge state.
///
/// Tracks which fields were set by important accessors so that a later
/// important value can displace an earlier ordinary one exactly once.
#[derive(Debug, Default)]
pub struct StreamMerger {
    streams: StreamSet,
    important: BTreeMap<usize, Vec<String>>,
    conflicts: Vec<String>,
}

impl StreamMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one model record into the merged set.
    pub fn add(&mut self, record: &ModelRecord) {
        let stream = self
            .streams
            .entry(record.index)
            .or_insert_with(StreamRecord::new);
        let important = self.important.entry(record.index).or_default();

        for entry in &record.entries {
            let was_important = important.iter().any(|n| n == &entry.name);
            match stream.get(&entry.name).cloned() {
                None => stream.set(&entry.name, entry.value.clone()),
                Some(current) if current.is_missing() => {
                    stream.set(&entry.name, entry.value.clone())
                }
                Some(_) if entry.value.is_missing() => continue,
                Some(current) if current == entry.value => {}
                Some(current) => {
                    if entry.important && !was_important {
                        tracing::debug!(
                            stream = record.index,
                            field = %entry.name,
                            old = %current,
                            new = %entry.value,
                            "important value replaces earlier value"
                        );
                        stream.set(&entry.name, entry.value.clone());
                    } else if !entry.important && !was_important {
                        let conflict = format!(
                            "Conflict with values '{}' and '{}' for '{}'.",
                            current, entry.value, entry.name
                        );
                        tracing::warn!(stream = record.index, "{}", conflict);
                        self.conflicts.push(conflict);
                    }
                }
            }
            if entry.important && !entry.value.is_missing() && !was_important {
                important.push(entry.name.clone());
            }
        }
    }

    pub fn finish(self) -> Merged {
        Merged {
            streams: self.streams,
            conflicts: self.conflicts,
        }
    }
}

/// Merge the stream contributions of several scrapers, in run order.
pub fn merge_streams<'a, I>(results: I) -> Merged
where
    I: IntoIterator<Item = &'a [ModelRecord]>,
{
    let mut merger = StreamMerger::new();
    for records in results {
        for record in records {
            merger.add(record);
        }
    }
    merger.finish()
}
