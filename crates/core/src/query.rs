//! List query model: field projection, sorting and pagination.
//!
//! Query parameters arrive as raw strings (`fields`, `sort`, `page`, `limit`)
//! and are parsed once into a [`ListQuery`]. Sorting and projection operate on
//! the serialized JSON form of a resource, so any top-level output field can
//! be selected or sorted on.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::ValidationError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    /// Parse `field` (ascending) or `-field` (descending).
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        let (field, order) = match raw.strip_prefix('-') {
            Some(rest) => (rest.trim(), SortOrder::Desc),
            None => (raw.strip_prefix('+').unwrap_or(raw).trim(), SortOrder::Asc),
        };
        if field.is_empty() {
            return Err(ValidationError::InvalidQuery {
                param: "sort".to_string(),
                reason: "a field name is expected, optionally prefixed with '-'".to_string(),
            });
        }
        Ok(Self {
            field: field.to_string(),
            order,
        })
    }
}

/// Raw `?fields=&sort=&page=&limit=` values, parsed only when an operation
/// reaches its validation stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub fields: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListParams {
    pub fn parse(&self) -> Result<ListQuery, ValidationError> {
        ListQuery::parse(
            self.fields.as_deref(),
            self.sort.as_deref(),
            self.page.as_deref(),
            self.limit.as_deref(),
        )
    }

    /// `fields` only, for single-resource reads. Never fails.
    pub fn projection(&self) -> ListQuery {
        ListQuery::with_fields(self.fields.as_deref())
    }
}

/// Parsed list parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Requested output fields (`None` = all fields). `id` is always included.
    pub fields: Option<Vec<String>>,
    pub sort: Option<SortSpec>,
    /// 1-indexed page number.
    pub page: u32,
    pub limit: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            fields: None,
            sort: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListQuery {
    pub fn parse(
        fields: Option<&str>,
        sort: Option<&str>,
        page: Option<&str>,
        limit: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let sort = match sort.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(SortSpec::parse(raw)?),
            None => None,
        };

        Ok(Self {
            fields: parse_fields(fields),
            sort,
            page: parse_positive("page", page, DEFAULT_PAGE)?,
            limit: parse_positive("limit", limit, DEFAULT_LIMIT)?,
        })
    }

    /// Only `fields` applied; everything else default. Used for single-resource reads.
    pub fn with_fields(fields: Option<&str>) -> Self {
        Self {
            fields: parse_fields(fields),
            ..Self::default()
        }
    }

    /// Keep `id` plus the requested fields of a serialized resource.
    pub fn project(&self, value: JsonValue) -> JsonValue {
        let Some(fields) = &self.fields else {
            return value;
        };
        let JsonValue::Object(mut obj) = value else {
            return value;
        };

        let mut out = Map::new();
        if let Some(id) = obj.remove("id") {
            out.insert("id".to_string(), id);
        }
        for field in fields {
            if let Some(v) = obj.remove(field) {
                out.insert(field.clone(), v);
            }
        }
        JsonValue::Object(out)
    }

    /// Sort (if requested) and cut out the requested page.
    pub fn sort_and_paginate<T, F>(&self, mut items: Vec<T>, to_json: F) -> Vec<T>
    where
        F: Fn(&T) -> JsonValue,
    {
        if let Some(sort) = &self.sort {
            let mut keyed: Vec<(JsonValue, T)> = items
                .into_iter()
                .map(|item| (to_json(&item).get(&sort.field).cloned().unwrap_or(JsonValue::Null), item))
                .collect();
            keyed.sort_by(|(a, _), (b, _)| {
                let ord = compare_json(a, b);
                match sort.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
            items = keyed.into_iter().map(|(_, item)| item).collect();
        }

        let skip = (self.page.saturating_sub(1) as usize).saturating_mul(self.limit as usize);
        items.into_iter().skip(skip).take(self.limit as usize).collect()
    }
}

/// `a, b,,c` -> `["a", "b", "c"]`; nothing selected means all fields.
fn parse_fields(raw: Option<&str>) -> Option<Vec<String>> {
    let fields: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    (!fields.is_empty()).then_some(fields)
}

fn parse_positive(param: &str, raw: Option<&str>, default: u32) -> Result<u32, ValidationError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };
    match raw.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ValidationError::InvalidQuery {
            param: param.to_string(),
            reason: "a positive integer is expected".to_string(),
        }),
    }
}

fn type_rank(v: &JsonValue) -> u8 {
    match v {
        JsonValue::Null => 0,
        JsonValue::Bool(_) => 1,
        JsonValue::Number(_) => 2,
        JsonValue::String(_) => 3,
        JsonValue::Array(_) => 4,
        JsonValue::Object(_) => 5,
    }
}

fn compare_json(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
