use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{QuarryError, Result};

/// The value type for document metadata and filter operands.
///
/// Serialized untagged, so metadata reads and writes as plain JSON scalars
/// and arrays. Date strings stay `String` on the way in and are recognized
/// as dates only when a filter compares them.
///
/// A `DateTime` serializes as an RFC 3339 string and deserializes back as
/// `String`, so the variant does not survive a serde round trip. Filters are
/// unaffected because comparisons parse date strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),

    /// Date and time in UTC.
    DateTime(chrono::DateTime<chrono::Utc>),

    /// List of values (e.g. tags).
    List(Vec<DataValue>),
}

impl DataValue {
    /// Convert a JSON value into a `DataValue`.
    ///
    /// Returns `None` for JSON objects (nested mappings are not values).
    pub fn from_json(value: &serde_json::Value) -> Option<DataValue> {
        use serde_json::Value;

        match value {
            Value::Null => Some(DataValue::Null),
            Value::Bool(b) => Some(DataValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(DataValue::Int64(i)),
                None => n.as_f64().map(DataValue::Float64),
            },
            Value::String(s) => Some(DataValue::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(DataValue::from_json)
                .collect::<Option<Vec<_>>>()
                .map(DataValue::List),
            Value::Object(_) => None,
        }
    }

    /// Returns the string value if this is a String variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric value of Int64 and Float64 variants.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Int64(i) => Some(*i as f64),
            DataValue::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the items if this is a List variant.
    pub fn as_list(&self) -> Option<&[DataValue]> {
        match self {
            DataValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, DataValue::Int64(_) | DataValue::Float64(_))
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => Ok(()),
            DataValue::Bool(b) => write!(f, "{b}"),
            DataValue::Int64(i) => write!(f, "{i}"),
            DataValue::Float64(v) => write!(f, "{v}"),
            DataValue::String(s) => f.write_str(s),
            DataValue::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
            DataValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

// --- Conversions ---

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::String(v)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::String(v.to_string())
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        DataValue::Int64(v)
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        DataValue::Int64(v as i64)
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Float64(v)
    }
}

impl From<f32> for DataValue {
    fn from(v: f32) -> Self {
        DataValue::Float64(v as f64)
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Bool(v)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DataValue {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        DataValue::DateTime(dt)
    }
}

impl<T: Into<DataValue>> From<Vec<T>> for DataValue {
    fn from(v: Vec<T>) -> Self {
        DataValue::List(v.into_iter().map(Into::into).collect())
    }
}

/// Tabular document content: a header row and row-major cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<DataValue>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row of cells.
    pub fn add_row<I, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DataValue>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    /// Whether every row has exactly one cell per column.
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|row| row.len() == self.columns.len())
    }

    /// Render the table as CSV: the header row first, then each row with
    /// stringified cells.
    ///
    /// Fails if the table is ragged.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&self.columns)
            .map_err(|e| QuarryError::validation(format!("failed to render table: {e}")))?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|cell| cell.to_string()))
                .map_err(|e| QuarryError::validation(format!("failed to render table: {e}")))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| QuarryError::validation(format!("failed to render table: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| QuarryError::validation(format!("table is not valid UTF-8: {e}")))
    }
}

/// The payload of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Table(Table),
}

impl Content {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            Content::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Content::Table(t) => Some(t),
            Content::Text(_) => None,
        }
    }

    /// The content type matching this payload's shape.
    pub fn natural_type(&self) -> ContentType {
        match self {
            Content::Text(_) => ContentType::Text,
            Content::Table(_) => ContentType::Table,
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

/// Declared kind of a document's content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Table,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Table => "table",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(ContentType::Text),
            "table" => Ok(ContentType::Table),
            other => Err(QuarryError::validation(format!(
                "unknown content type '{other}'"
            ))),
        }
    }
}

/// A stored record: ID, payload, content type, metadata and an optional
/// retrieval score.
///
/// The ID cannot be changed after construction. The score is only set on the
/// copies returned by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    content: Content,
    #[serde(default)]
    content_type: ContentType,
    /// Arbitrary metadata.
    #[serde(default)]
    pub meta: HashMap<String, DataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
}

impl Document {
    /// Create a text document.
    pub fn text(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Content::Text(content.into()),
            content_type: ContentType::Text,
            meta: HashMap::new(),
            score: None,
        }
    }

    /// Create a table document.
    pub fn table(id: impl Into<String>, table: Table) -> Self {
        Self {
            id: id.into(),
            content: Content::Table(table),
            content_type: ContentType::Table,
            meta: HashMap::new(),
            score: None,
        }
    }

    /// Create a new document builder.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    /// Add a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// Get a metadata value.
    pub fn get_meta(&self, key: &str) -> Option<&DataValue> {
        self.meta.get(key)
    }

    /// Copy of this document carrying the given score.
    pub(crate) fn scored(&self, score: f64) -> Self {
        let mut doc = self.clone();
        doc.score = Some(score);
        doc
    }

    /// Check that the document is well formed: a non-blank ID and a payload
    /// whose shape matches the declared content type.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(QuarryError::validation("document ID must not be empty"));
        }
        if self.content.natural_type() != self.content_type {
            return Err(QuarryError::validation(format!(
                "document '{}' declares content type '{}' but carries {} content",
                self.id,
                self.content_type,
                self.content.natural_type()
            )));
        }
        Ok(())
    }
}

/// A builder for constructing documents in a fluent manner.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    id: Option<String>,
    content: Content,
    meta: HashMap<String, DataValue>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the document ID. If unset, a UUID (v4) is generated on build.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.content = Content::Text(text.into());
        self
    }

    pub fn table(mut self, table: Table) -> Self {
        self.content = Content::Table(table);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Document {
        let content_type = self.content.natural_type();
        Document {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            content: self.content,
            content_type,
            meta: self.meta,
            score: None,
        }
    }
}
