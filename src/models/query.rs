use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::table::Row;
use crate::table::{Filter, QueryState, SortOrder, parse_number};

/// Filter match modes understood by the server
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchMode {
    StartsWith,
    Contains,
    NotContains,
    EndsWith,
    Equals,
    NotEquals,
    In,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl MatchMode {
    pub fn parse(mode: &str) -> Option<Self> {
        Some(match mode {
            "startsWith" => MatchMode::StartsWith,
            "contains" => MatchMode::Contains,
            "notContains" => MatchMode::NotContains,
            "endsWith" => MatchMode::EndsWith,
            "equals" => MatchMode::Equals,
            "notEquals" => MatchMode::NotEquals,
            "in" => MatchMode::In,
            "lt" => MatchMode::LessThan,
            "lte" => MatchMode::LessThanOrEqual,
            "gt" => MatchMode::GreaterThan,
            "gte" => MatchMode::GreaterThanOrEqual,
            _ => return None,
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unsupported match mode: {mode}")]
    UnsupportedMatchMode { field: String, mode: String },
}

impl QueryError {
    /// Validation errors keyed by the offending parameter
    pub fn errors(&self) -> Map<String, Value> {
        let mut errors = Map::new();
        match self {
            QueryError::UnsupportedMatchMode { field, .. } => {
                errors.insert(format!("filters.{field}"), Value::from(self.to_string()));
            }
        }
        errors
    }
}

/// One page of a filtered, sorted table
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSlice {
    pub data: Vec<Row>,
    /// Rows matching the filters, across all pages
    pub total: usize,
    pub page: u32,
    pub rows: u32,
    pub first_row: u64,
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s).and_then(|n| n.as_f64()),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    }
}

fn loosely_equal(cell: &Value, expected: &Value) -> bool {
    match (as_number(cell), as_number(expected)) {
        (Some(a), Some(b)) => a.total_cmp(&b) == Ordering::Equal,
        _ => as_text(cell) == as_text(expected),
    }
}

fn compare(cell: &Value, expected: &Value) -> Ordering {
    match (as_number(cell), as_number(expected)) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        _ => as_text(cell).cmp(&as_text(expected)),
    }
}

fn matches_one(cell: Option<&Value>, mode: MatchMode, expected: &Value) -> bool {
    let cell = match cell {
        None | Some(Value::Null) => {
            return matches!(mode, MatchMode::NotContains | MatchMode::NotEquals);
        }
        Some(cell) => cell,
    };
    match mode {
        MatchMode::StartsWith => as_text(cell).starts_with(&as_text(expected)),
        MatchMode::Contains => as_text(cell).contains(&as_text(expected)),
        MatchMode::NotContains => !as_text(cell).contains(&as_text(expected)),
        MatchMode::EndsWith => as_text(cell).ends_with(&as_text(expected)),
        MatchMode::Equals | MatchMode::In => loosely_equal(cell, expected),
        MatchMode::NotEquals => !loosely_equal(cell, expected),
        MatchMode::LessThan => compare(cell, expected) == Ordering::Less,
        MatchMode::LessThanOrEqual => compare(cell, expected) != Ordering::Greater,
        MatchMode::GreaterThan => compare(cell, expected) == Ordering::Greater,
        MatchMode::GreaterThanOrEqual => compare(cell, expected) != Ordering::Less,
    }
}

/// A list value matches when any of its entries does. An array cell is
/// matched through its entries too, so `in` works against tag lists.
fn matches(row: &Row, field: &str, mode: MatchMode, filter: &Filter) -> bool {
    let cell = row.get(field);
    if let Some(Value::Array(items)) = cell {
        if matches!(mode, MatchMode::In | MatchMode::Equals) {
            return items
                .iter()
                .any(|item| matches(&single(field, item), field, mode, filter));
        }
    }
    match &filter.value {
        Value::Null => true,
        Value::Array(expected) => expected
            .iter()
            .any(|expected| matches_one(cell, mode, expected)),
        expected => matches_one(cell, mode, expected),
    }
}

fn single(field: &str, value: &Value) -> Row {
    let mut row = Row::new();
    row.insert(field.to_string(), value.clone());
    row
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        Some(Value::Number(_)) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Array(_) | Value::Object(_)) => 3,
        Some(Value::Null) | None => 4,
    }
}

fn sort_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x @ (Value::Array(_) | Value::Object(_))), Some(y)) if rank(Some(y)) == 3 => {
            x.to_string().cmp(&y.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Filter, sort and cut one page out of `rows`.
pub fn apply_query(rows: &[Row], query: &QueryState) -> Result<TableSlice, QueryError> {
    let mut constraints = Vec::new();
    for (field, filter) in &query.filters {
        if !filter.is_active() {
            continue;
        }
        let mode =
            MatchMode::parse(&filter.match_mode).ok_or_else(|| QueryError::UnsupportedMatchMode {
                field: field.clone(),
                mode: filter.match_mode.clone(),
            })?;
        constraints.push((field.as_str(), mode, filter));
    }

    let mut selected: Vec<&Row> = rows
        .iter()
        .filter(|row| {
            constraints
                .iter()
                .all(|(field, mode, filter)| matches(row, field, *mode, filter))
        })
        .collect();

    if query.sort.is_sorted() {
        let field = query.sort.field.as_str();
        selected.sort_by(|a, b| {
            let ordering = sort_cells(a.get(field), b.get(field));
            match query.sort.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
    }

    let total = selected.len();
    let first_row = query.first_row_offset();
    let skip = usize::try_from(first_row).unwrap_or(usize::MAX);
    let take = usize::try_from(query.page.rows_per_page).unwrap_or(usize::MAX);
    let data = selected.into_iter().skip(skip).take(take).cloned().collect();
    Ok(TableSlice {
        data,
        total,
        page: query.page.current_page,
        rows: query.page.rows_per_page,
        first_row,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;
    use tracing::Span;

    use super::*;
    use crate::models::Table;
    use crate::table::{FilterSet, UrlParams};

    fn people() -> Vec<Row> {
        Table::load(&Span::none(), Path::new("./fixtures/data/people.json"))
            .unwrap()
            .rows
    }

    fn query(params: serde_json::Value) -> QueryState {
        let params: UrlParams = serde_json::from_value(params).unwrap();
        params.resolve(&QueryState::new(FilterSet::new(), 20))
    }

    fn ids(slice: &TableSlice) -> Vec<i64> {
        slice
            .data
            .iter()
            .map(|row| row["id"].as_i64().unwrap())
            .collect()
    }

    #[test]
    fn unfiltered_first_page() {
        let slice = apply_query(&people(), &query(json!({ "rows": "5" }))).unwrap();
        assert_eq!(vec![1, 2, 3, 4, 5], ids(&slice));
        assert_eq!(12, slice.total);
        assert_eq!(0, slice.first_row);
    }

    #[test]
    fn later_page() {
        let slice = apply_query(&people(), &query(json!({ "page": "3", "rows": "5" }))).unwrap();
        assert_eq!(vec![11, 12], ids(&slice));
        assert_eq!(10, slice.first_row);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let slice = apply_query(&people(), &query(json!({ "page": "9", "rows": "5" }))).unwrap();
        assert!(slice.data.is_empty());
        assert_eq!(12, slice.total);
    }

    #[test]
    fn numeric_string_matches_number() {
        let q = query(json!({ "filters": { "age": { "value": "30", "matchMode": "equals" } } }));
        assert_eq!(vec![1, 5], ids(&apply_query(&people(), &q).unwrap()));
    }

    #[test]
    fn text_modes_ignore_case() {
        let q = query(json!({ "filters": { "name": { "value": "AN", "matchMode": "contains" } } }));
        assert_eq!(vec![1, 4], ids(&apply_query(&people(), &q).unwrap()));
        let filters = json!({ "city": { "value": "o", "matchMode": "startsWith" } });
        let q = query(json!({ "filters": filters }));
        assert_eq!(vec![1, 3, 8], ids(&apply_query(&people(), &q).unwrap()));
    }

    #[test]
    fn in_matches_any_entry() {
        let filters = json!({ "city": { "value": ["Rome", "Cairo"], "matchMode": "in" } });
        let q = query(json!({ "filters": filters }));
        assert_eq!(vec![6, 7, 10, 11], ids(&apply_query(&people(), &q).unwrap()));
        let q = query(json!({ "filters": { "tags": { "value": ["3"], "matchMode": "in" } } }));
        assert_eq!(vec![4, 6, 9, 10], ids(&apply_query(&people(), &q).unwrap()));
    }

    #[test]
    fn comparisons_skip_nulls() {
        let q = query(json!({ "filters": { "age": { "value": 45, "matchMode": "gte" } } }));
        assert_eq!(vec![6, 10], ids(&apply_query(&people(), &q).unwrap()));
        let q = query(json!({ "filters": { "age": { "value": 20, "matchMode": "lt" } } }));
        assert_eq!(vec![4], ids(&apply_query(&people(), &q).unwrap()));
    }

    #[test]
    fn null_filters_do_not_constrain() {
        let q = query(json!({ "filters": {
            "age": { "value": null, "matchMode": "equals" },
            "status": { "value": "inactive", "matchMode": "equals" },
        } }));
        assert_eq!(vec![3, 7, 12], ids(&apply_query(&people(), &q).unwrap()));
    }

    #[test]
    fn empty_values_do_not_constrain() {
        let q = query(json!({ "filters": { "city": { "value": "", "matchMode": "equals" } } }));
        assert_eq!(12, apply_query(&people(), &q).unwrap().total);
        let q = query(json!({ "filters": { "city": { "value": [], "matchMode": "in" } } }));
        assert_eq!(12, apply_query(&people(), &q).unwrap().total);
        let q = query(json!({ "filters": { "city": { "value": "", "matchMode": "between" } } }));
        assert_eq!(12, apply_query(&people(), &q).unwrap().total);
    }

    #[test]
    fn empty_values_agree_with_active_filters() {
        let q = query(json!({ "filters": { "city": { "value": "", "matchMode": "equals" } } }));
        assert!(q.filters.values().all(|filter| !filter.is_active()));
        let slice = apply_query(&people(), &q).unwrap();
        assert_eq!(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12], ids(&slice));
    }

    #[test]
    fn sort_descending_puts_nulls_first() {
        let q = query(json!({ "sortField": "age", "sortOrder": "-1", "rows": "3" }));
        assert_eq!(vec![9, 6, 10], ids(&apply_query(&people(), &q).unwrap()));
        let q = query(json!({ "sortField": "age", "sortOrder": "1", "page": "4", "rows": "3" }));
        assert_eq!(vec![10, 6, 9], ids(&apply_query(&people(), &q).unwrap()));
    }

    #[test]
    fn sort_is_stable() {
        let q = query(json!({ "sortField": "city", "rows": "4" }));
        assert_eq!(vec![6, 11, 4, 9], ids(&apply_query(&people(), &q).unwrap()));
    }

    #[test]
    fn unsupported_match_mode() {
        let q = query(json!({ "filters": { "age": { "value": 1, "matchMode": "between" } } }));
        let err = apply_query(&people(), &q).unwrap_err();
        assert_eq!(
            QueryError::UnsupportedMatchMode {
                field: "age".into(),
                mode: "between".into()
            },
            err
        );
        assert_eq!(
            Some(&json!("unsupported match mode: between")),
            err.errors().get("filters.age")
        );
    }
}
