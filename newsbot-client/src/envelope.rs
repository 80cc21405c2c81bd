//! List response normalization.
//!
//! The documented contract for list endpoints is [`Paginated`]: `data` plus pagination
//! metadata. Older endpoints still answer with a bare array or an `items` envelope, so
//! [`Envelope`] accepts all three and [`normalize`] folds them into one [`Page`].
//! New endpoints should only ever emit the `data` form.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pagination envelope emitted by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// Every response shape a list endpoint is known to produce.
#[derive(Debug)]
pub enum Envelope<T> {
    Bare(Vec<T>),
    Data { data: Vec<T>, meta: PageMeta },
    Items { items: Vec<T>, meta: PageMeta },
}

/// Optional pagination fields carried next to `data`/`items`.
#[derive(Debug, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default, alias = "count")]
    pub total: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
}

fn invalid(message: impl std::fmt::Display) -> serde_json::Error {
    de::Error::custom(message)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode a list field item by item so a failure names the offending entry.
fn decode_items<T: DeserializeOwned>(field: &str, value: Value) -> Result<Vec<T>, serde_json::Error> {
    let entries = match value {
        // Go encodes an empty slice as `null`.
        Value::Null => return Ok(Vec::new()),
        Value::Array(entries) => entries,
        other => {
            return Err(invalid(format!(
                "{}: expected an array, found {}",
                field,
                kind(&other)
            )))
        }
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value(entry).map_err(|e| invalid(format!("{}[{}]: {}", field, index, e)))
        })
        .collect()
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Pick the shape by the keys present, then decode only that field.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Array(_) => Ok(Envelope::Bare(decode_items("response", value)?)),
            Value::Object(mut fields) => {
                if let Some(data) = fields.remove("data") {
                    let meta = serde_json::from_value(Value::Object(fields))?;
                    Ok(Envelope::Data {
                        data: decode_items("data", data)?,
                        meta,
                    })
                } else if let Some(items) = fields.remove("items") {
                    let meta = serde_json::from_value(Value::Object(fields))?;
                    Ok(Envelope::Items {
                        items: decode_items("items", items)?,
                        meta,
                    })
                } else {
                    Err(invalid("list response has neither `data` nor `items`"))
                }
            }
            other => Err(invalid(format!(
                "expected a list response, found {}",
                kind(&other)
            ))),
        }
    }
}

/// Uniform view of one page of a list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    /// Always at least 1.
    pub total_pages: u32,
    pub page: Option<u32>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            total_pages: 1,
            page: None,
        }
    }
}

impl<T> Page<T> {
    fn from_parts(items: Vec<T>, meta: PageMeta) -> Self {
        let total = meta.total.unwrap_or(items.len() as u64);
        Self {
            items,
            total,
            total_pages: meta.total_pages.unwrap_or(1).max(1),
            page: meta.page,
        }
    }
}

impl<T> From<Envelope<T>> for Page<T> {
    fn from(envelope: Envelope<T>) -> Self {
        match envelope {
            Envelope::Bare(items) => Page::from_parts(items, PageMeta::default()),
            Envelope::Data { data, meta } => Page::from_parts(data, meta),
            Envelope::Items { items, meta } => Page::from_parts(items, meta),
        }
    }
}

impl<T> From<Paginated<T>> for Page<T> {
    fn from(p: Paginated<T>) -> Self {
        Self {
            items: p.data,
            total: p.total,
            total_pages: p.total_pages.max(1),
            page: Some(p.page),
        }
    }
}

/// Normalize a raw list response. `null` is an empty page.
pub fn normalize<T: DeserializeOwned>(value: serde_json::Value) -> Result<Page<T>, serde_json::Error> {
    if value.is_null() {
        return Ok(Page::default());
    }
    Ok(Envelope::from_value(value)?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Item {
        id: i64,
    }

    #[test]
    fn three_shapes_normalize_identically() {
        let bare: Page<Item> = normalize(json!([{"id": 1}, {"id": 2}])).unwrap();
        let data: Page<Item> = normalize(json!({"data": [{"id": 1}, {"id": 2}]})).unwrap();
        let items: Page<Item> = normalize(json!({"items": [{"id": 1}, {"id": 2}]})).unwrap();

        assert_eq!(bare, data);
        assert_eq!(data, items);
        assert_eq!(bare.total, 2);
        assert_eq!(bare.total_pages, 1);
    }

    #[test]
    fn server_pagination_is_kept() {
        let page: Page<Item> = normalize(json!({
            "data": [{"id": 21}],
            "total": 41,
            "page": 3,
            "page_size": 20,
            "total_pages": 3
        }))
        .unwrap();
        assert_eq!(page.items, vec![Item { id: 21 }]);
        assert_eq!(page.total, 41);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, Some(3));
    }

    #[test]
    fn count_is_an_alias_for_total() {
        let page: Page<Item> = normalize(json!({"items": [], "count": 12})).unwrap();
        assert_eq!(page.total, 12);
    }

    #[test]
    fn null_payloads_are_empty() {
        let page: Page<Item> = normalize(serde_json::Value::Null).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);

        let page: Page<Item> = normalize(json!({"data": null, "total": 0, "total_pages": 0})).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn unknown_shape_is_an_error() {
        assert!(normalize::<Item>(json!({"results": []})).is_err());
        assert!(normalize::<Item>(json!("nope")).is_err());
    }

    #[test]
    fn bad_entry_is_named_in_the_error() {
        let err = normalize::<Item>(json!({"data": [{"id": 1}, {"title": "no id"}], "total": 2})).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("data[1]"), "{}", message);
        assert!(message.contains("id"), "{}", message);

        let err = normalize::<Item>(json!({"items": {"id": 1}})).unwrap_err();
        assert!(err.to_string().contains("items: expected an array"));
    }

    #[test]
    fn documented_contract_converts() {
        let p = Paginated {
            data: vec![Item { id: 1 }],
            total: 1,
            page: 1,
            page_size: 20,
            total_pages: 0,
        };
        let page: Page<Item> = p.into();
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, Some(1));
    }
}
