use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::form_urlencoded;

use super::filter::{FilterSet, coerce_url_filters};
use super::query::{PageSpec, QueryState, SortOrder, SortSpec};

pub const FILTERS_PARAM: &str = "filters";
pub const SORT_FIELD_PARAM: &str = "sortField";
pub const SORT_ORDER_PARAM: &str = "sortOrder";
pub const PAGE_PARAM: &str = "page";
pub const ROWS_PARAM: &str = "rows";

/// Query state as it appears in a page address: every scalar is text and
/// any of them may be missing or malformed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlParams {
    #[serde(
        default,
        deserialize_with = "loose_filters",
        skip_serializing_if = "Option::is_none"
    )]
    pub filters: Option<FilterSet>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub sort_field: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub sort_order: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub page: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub rows: Option<String>,
}

/// Accepts strings, numbers and booleans; anything else reads as absent.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accepts a filter mapping; any other shape reads as absent.
fn loose_filters<'de, D>(deserializer: D) -> Result<Option<FilterSet>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// Integer prefix of `text`, the way browsers read `parseInt`.
fn parse_int(text: Option<&str>) -> Option<i64> {
    let text = text?.trim_start();
    let (sign, digits) = match text.as_bytes().first() {
        Some(b'-') => (-1, &text[1..]),
        Some(b'+') => (1, &text[1..]),
        _ => (1, text),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

fn parse_positive(text: Option<&str>) -> Option<u32> {
    parse_int(text)
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
}

impl UrlParams {
    /// Reads the recognized parameters out of a raw query string. Unknown
    /// keys are ignored; a `filters` value that is not a JSON mapping is
    /// treated as absent.
    pub fn from_query(query: &str) -> Self {
        let mut params = UrlParams::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                FILTERS_PARAM => {
                    params.filters = match serde_json::from_str::<FilterSet>(&value) {
                        Ok(filters) => Some(filters),
                        Err(err) => {
                            warn!(%err, "ignore undecodable filters");
                            None
                        }
                    }
                }
                SORT_FIELD_PARAM => params.sort_field = Some(value.into_owned()),
                SORT_ORDER_PARAM => params.sort_order = Some(value.into_owned()),
                PAGE_PARAM => params.page = Some(value.into_owned()),
                ROWS_PARAM => params.rows = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    /// Encodes the present parameters as a query string.
    pub fn to_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if let Some(filters) = &self.filters {
            if let Ok(encoded) = serde_json::to_string(filters) {
                serializer.append_pair(FILTERS_PARAM, &encoded);
            }
        }
        let scalars = [
            (SORT_FIELD_PARAM, &self.sort_field),
            (SORT_ORDER_PARAM, &self.sort_order),
            (PAGE_PARAM, &self.page),
            (ROWS_PARAM, &self.rows),
        ];
        for (key, value) in scalars {
            if let Some(value) = value {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    /// Resolves these parameters into a query state, taking every missing or
    /// unparsable part from `defaults`.
    pub fn resolve(&self, defaults: &QueryState) -> QueryState {
        let mut filters = self
            .filters
            .clone()
            .unwrap_or_else(|| defaults.filters.clone());
        coerce_url_filters(&mut filters);

        let field = match self.sort_field.as_deref() {
            Some(field) if !field.is_empty() => field.to_string(),
            _ => defaults.sort.field.clone(),
        };
        let order = parse_int(self.sort_order.as_deref())
            .and_then(SortOrder::from_int)
            .unwrap_or(defaults.sort.order);
        let current_page =
            parse_positive(self.page.as_deref()).unwrap_or(defaults.page.current_page);
        let rows_per_page =
            parse_positive(self.rows.as_deref()).unwrap_or(defaults.page.rows_per_page);
        debug!(%field, current_page, rows_per_page, "resolved url params");

        QueryState {
            filters,
            sort: SortSpec { field, order },
            page: PageSpec {
                current_page,
                rows_per_page,
            },
        }
    }
}

impl From<&QueryState> for UrlParams {
    fn from(state: &QueryState) -> Self {
        Self {
            filters: Some(state.filters.clone()),
            sort_field: Some(state.sort.field.clone()),
            sort_order: Some(state.sort.order.as_i8().to_string()),
            page: Some(state.page.current_page.to_string()),
            rows: Some(state.page.rows_per_page.to_string()),
        }
    }
}
