// Product normalization: turns the loosely shaped JSON returned by the
// lookup API into a `NormalizedProduct` with every field filled in.
//
// The API is not consistent about its payload. The product may or may not
// be wrapped in a `product` key, field names come in camelCase or
// snake_case, and `specs` entries can be strings, objects or pairs. Each
// output field is therefore resolved through an ordered list of candidate
// accessors; the first one that yields a value wins.

use serde::Serialize;
use serde_json::Value;

/// Placeholder shown for any field the API did not provide.
pub const MISSING: &str = "N/A";

/// One entry of a product's spec list, classified once at normalization
/// time so renderers never have to inspect raw JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SpecEntry {
    /// A free-form line such as `"Gluten free"`.
    Text(String),
    /// A labelled value such as `Weight: 500 g`.
    Pair { key: String, value: String },
}

/// Stable, field-complete view of a lookup response used for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedProduct {
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub image_url: String,
    pub specs: Vec<SpecEntry>,
    pub barcode: String,
    pub barcode_type: String,
}

type Accessor = fn(&Value) -> Option<String>;

const IMAGE_URL: &[Accessor] = &[
    |p: &Value| text_at(p, "imageUrl"),
    |p: &Value| text_at(p, "image_url"),
    |p: &Value| p.get("images").and_then(|imgs| imgs.get(0)).and_then(as_text),
];

const BARCODE: &[Accessor] = &[
    |d: &Value| text_at(d, "barcode"),
    |d: &Value| text_at(d, "code"),
];

const BARCODE_TYPE: &[Accessor] = &[
    |d: &Value| text_at(d, "barcodeType"),
    |d: &Value| text_at(d, "type"),
];

const SPEC_KEYS: &[&str] = &["specs", "attributes", "specifications"];

/// Normalize a raw lookup response.
///
/// Product fields are read from `data.product` when it is an object and
/// from `data` itself otherwise; `barcode` and `barcodeType` always come
/// from the top level. Missing fields become [`MISSING`], missing specs
/// become an empty list.
#[must_use]
pub fn format_product(data: &Value) -> NormalizedProduct {
    let product = match data.get("product") {
        Some(inner) if inner.is_object() => inner,
        _ => data,
    };

    NormalizedProduct {
        name: text_or_missing(text_at(product, "name")),
        description: text_or_missing(text_at(product, "description")),
        brand: text_or_missing(text_at(product, "brand")),
        category: text_or_missing(text_at(product, "category")),
        image_url: text_or_missing(first_present(product, IMAGE_URL)),
        specs: specs_of(product),
        barcode: text_or_missing(first_present(data, BARCODE)),
        barcode_type: text_or_missing(first_present(data, BARCODE_TYPE)),
    }
}

/// Classify a single raw spec entry.
///
/// Returns `None` for entries that have nothing displayable (null, numbers,
/// empty objects), which are then left out of the product's spec list.
///
/// For objects, the key is taken from `key`, then `name`, and the value from
/// `value`, then `val`. When a convention is missing, the object's first
/// property stands in for it: its name as the key, its value as the value.
/// The two fallbacks are independent, so `{"key": "Color", "x": "red"}`
/// renders as `Color: Color`.
#[must_use]
pub fn classify_spec(entry: &Value) -> Option<SpecEntry> {
    match entry {
        Value::String(s) => Some(SpecEntry::Text(s.clone())),
        Value::Object(map) => {
            let (first_key, first_value) = map.iter().next()?;
            let key = text_at(entry, "key")
                .or_else(|| text_at(entry, "name"))
                .unwrap_or_else(|| first_key.clone());
            let value = text_at(entry, "value")
                .or_else(|| text_at(entry, "val"))
                .or_else(|| display_value(first_value))
                .unwrap_or_default();
            Some(SpecEntry::Pair { key, value })
        }
        Value::Array(items) if items.len() == 2 => {
            let key = display_value(&items[0])?;
            let value = display_value(&items[1]).unwrap_or_default();
            Some(SpecEntry::Pair { key, value })
        }
        _ => None,
    }
}

fn specs_of(product: &Value) -> Vec<SpecEntry> {
    SPEC_KEYS
        .iter()
        .find_map(|key| product.get(*key).and_then(Value::as_array))
        .map(|entries| entries.iter().filter_map(classify_spec).collect())
        .unwrap_or_default()
}

fn first_present(value: &Value, candidates: &[Accessor]) -> Option<String> {
    candidates.iter().find_map(|accessor| accessor(value))
}

fn text_at(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(as_text)
}

/// A value counts as present when it is a non-empty string, a non-zero
/// number or `true`. Null, `false`, `0`, empty strings and containers are
/// absent.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Like [`as_text`] but also renders nested containers as compact JSON,
/// used where a spec value has an unexpected shape.
fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
        other => as_text(other),
    }
}

fn text_or_missing(value: Option<String>) -> String {
    value.unwrap_or_else(|| MISSING.to_string())
}
