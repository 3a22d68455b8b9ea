//! Page window and wire envelopes

use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

/// Offset/length slice of the record set requested next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Zero-based offset of the next request
    pub start: u64,
    /// Records requested by the next request
    pub length: u64,
    /// Total record count last reported by the provider
    pub total_known: Option<u64>,
}

impl PageWindow {
    /// First window of a run
    pub fn new(length: u64) -> Self {
        Self::starting_at(0, length)
    }

    /// First window of a run resuming at `start`
    pub fn starting_at(start: u64, length: u64) -> Self {
        Self {
            start,
            length: length.max(1),
            total_known: None,
        }
    }

    /// Record the provider's total and move past the page just fetched.
    ///
    /// Returns `false` once the window has reached the reported total.
    /// Only the offset and the total decide; short pages do not.
    pub fn advance(&mut self, total: u64) -> bool {
        self.total_known = Some(total);

        let next = self.start.saturating_add(self.length);
        if next >= total {
            return false;
        }

        // The last page asks for exactly what is left
        self.length = self.length.min(total - next);
        self.start = next;
        true
    }
}

/// Column search filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Search {
    pub value: String,
    pub regex: bool,
}

/// Column descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub data: String,
    pub name: String,
    pub searchable: bool,
    pub orderable: bool,
    pub search: Search,
}

impl Column {
    /// Searchable, orderable column bound to `data`
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            name: String::new(),
            searchable: true,
            orderable: true,
            search: Search::default(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Ordering clause, referencing a column by index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub column: String,
    pub dir: SortDirection,
}

/// Page request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    pub draw: String,
    pub columns: Vec<Column>,
    pub order: Vec<Order>,
    pub start: u64,
    pub length: u64,
    pub search: Search,
    /// Provider-specific fields sent alongside the envelope
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            draw: "1".to_string(),
            columns: Vec::new(),
            order: Vec::new(),
            start: 0,
            length: 0,
            search: Search::default(),
            extra: JsonObject::new(),
        }
    }
}

impl PageRequest {
    /// Request over the given data columns
    pub fn for_columns(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| Column::new(*c)).collect(),
            ..Self::default()
        }
    }

    /// Add an ordering clause on the column at `index`
    #[must_use]
    pub fn order_by(mut self, index: usize, dir: SortDirection) -> Self {
        self.order.push(Order {
            column: index.to_string(),
            dir,
        });
        self
    }

    /// Start the run at `start` with pages of `length` records.
    /// A zero `length` keeps the driver's page size.
    #[must_use]
    pub fn window(mut self, start: u64, length: u64) -> Self {
        self.start = start;
        self.length = length;
        self
    }

    /// Add a provider-specific top-level field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Page response envelope, also used for the aggregate of a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    #[serde(default)]
    pub draw: JsonValue,
    pub records_total: u64,
    pub records_filtered: u64,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> PageResponse<T> {
    /// Aggregate with no records yet
    pub fn empty() -> Self {
        Self {
            draw: JsonValue::Null,
            records_total: 0,
            records_filtered: 0,
            data: Vec::new(),
        }
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when no records are held
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
