use serde::{Deserialize, Serialize};

use super::filter::FilterSet;

/// Direction of the sort, carried on the wire as `1` or `-1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i64")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Maps any positive integer to ascending and any negative one to
    /// descending. Zero has no direction.
    pub fn from_int(n: i64) -> Option<Self> {
        match n.signum() {
            1 => Some(SortOrder::Ascending),
            -1 => Some(SortOrder::Descending),
            _ => None,
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

impl From<SortOrder> for i8 {
    fn from(value: SortOrder) -> Self {
        value.as_i8()
    }
}

impl TryFrom<i64> for SortOrder {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        SortOrder::from_int(value).ok_or_else(|| format!("invalid sort order: {value}"))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortSpec {
    /// Empty when unsorted
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn is_sorted(&self) -> bool {
        !self.field.is_empty()
    }
}

/// One-based page position
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageSpec {
    pub current_page: u32,
    pub rows_per_page: u32,
}

impl PageSpec {
    pub fn first(rows_per_page: u32) -> Self {
        Self {
            current_page: 1,
            rows_per_page: rows_per_page.max(1),
        }
    }

    /// Zero-based index of the first row on the current page.
    pub fn first_row_offset(&self) -> u64 {
        u64::from(self.current_page.saturating_sub(1)) * u64::from(self.rows_per_page)
    }
}

/// Everything that drives a fetch: filters, sort and page position.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryState {
    pub filters: FilterSet,
    pub sort: SortSpec,
    pub page: PageSpec,
}

impl QueryState {
    pub fn new(filters: FilterSet, rows_per_page: u32) -> Self {
        Self {
            filters,
            sort: SortSpec::default(),
            page: PageSpec::first(rows_per_page),
        }
    }

    pub fn first_row_offset(&self) -> u64 {
        self.page.first_row_offset()
    }
}
