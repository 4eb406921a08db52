// ===============================
// src/domain.rs
// ===============================
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

// ---- Wire shape (untrusted, as served by the catalog endpoint) ----
// Loose field types: a malformed product is coerced or dropped, it never fails the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogPayload {
    #[serde(default, deserialize_with = "lenient_label", skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_products", skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<RawProduct>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Value>,
    #[serde(rename = "SKU", default, skip_serializing_if = "Option::is_none")]
    pub sku_upper: Option<Value>, // upstream kadang pakai "SKU" huruf besar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>, // string ("938.99") atau number
}

/// String as-is, number/bool via `to_string()`, null/array/object -> `None`.
pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_label<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(v.as_ref().and_then(scalar_text))
}

// non-array `products` -> None, non-object entries dropped
fn lenient_products<'de, D>(de: D) -> Result<Option<Vec<RawProduct>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Option::<Value>::deserialize(de)? {
        Some(Value::Array(items)) => items,
        _ => return Ok(None),
    };
    let products = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(_) => serde_json::from_value::<RawProduct>(item).ok(),
            other => {
                warn!(entry = %other, "catalog entry is not an object, dropped");
                None
            }
        })
        .collect();
    Ok(Some(products))
}

// ---- Canonical shape (after normalization) ----

/// Price as handed to the ledger: either already numeric or still text.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl From<f64> for PriceInput {
    fn from(v: f64) -> Self { PriceInput::Number(v) }
}
impl From<&str> for PriceInput {
    fn from(v: &str) -> Self { PriceInput::Text(v.to_string()) }
}
impl From<String> for PriceInput {
    fn from(v: String) -> Self { PriceInput::Text(v) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineInput {
    pub sku: Option<String>,
    pub title: String,
    pub price: PriceInput,
    pub quantity: Option<f64>,
}

/// Normalized catalog: one currency label + canonical lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub currency: String,
    pub products: Vec<LineInput>,
}

/// Any numeric-coercible quantity coming from the UI or a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestedQuantity {
    Number(f64),
    Text(String),
}

impl RequestedQuantity {
    /// `max(0, trunc(n))`; text that is not a number counts as 0.
    pub fn effective(&self) -> u32 {
        let n = match self {
            RequestedQuantity::Number(n) => *n,
            RequestedQuantity::Text(s) => {
                let t = s.trim();
                if t.is_empty() { 0.0 } else { t.parse::<f64>().unwrap_or(0.0) }
            }
        };
        if !n.is_finite() {
            // NaN -> 0, +inf saturates
            return if n == f64::INFINITY { u32::MAX } else { 0 };
        }
        n.trunc().max(0.0) as u32
    }
}

impl From<f64> for RequestedQuantity {
    fn from(v: f64) -> Self { RequestedQuantity::Number(v) }
}
impl From<i64> for RequestedQuantity {
    fn from(v: i64) -> Self { RequestedQuantity::Number(v as f64) }
}
impl From<i32> for RequestedQuantity {
    fn from(v: i32) -> Self { RequestedQuantity::Number(v as f64) }
}
impl From<u32> for RequestedQuantity {
    fn from(v: u32) -> Self { RequestedQuantity::Number(v as f64) }
}
impl From<&str> for RequestedQuantity {
    fn from(v: &str) -> Self { RequestedQuantity::Text(v.to_string()) }
}
impl From<String> for RequestedQuantity {
    fn from(v: String) -> Self { RequestedQuantity::Text(v) }
}

// ---- Ledger read models ----
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot { pub sku: String, pub title: String, pub unit_price: f64, pub quantity: u32 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSummary { pub total: f64, pub currency: String, pub lines: Vec<ProductSnapshot> }
