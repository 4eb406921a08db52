// ===============================
// src/catalog.rs
// ===============================
//
// Catalog sync:
// - fetch      : satu kali GET ke endpoint katalog (no-store, tanpa retry)
// - load       : fetch, atau FALLBACK kalau gagal (status non-2xx, timeout, JSON rusak)
// - normalize  : SKU/sku -> satu bentuk kanonik, harga jadi angka
//
use std::time::Duration;

use reqwest::{header, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::{scalar_text, Catalog, CatalogPayload, LineInput, PriceInput, RawProduct};
use crate::metrics::CATALOG_LOADS;

pub const DEFAULT_CATALOG_URL: &str = "https://jsonblob.com/api/1200000000000";
pub const DEFAULT_CURRENCY: &str = "€";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog endpoint answered {0}")]
    Status(StatusCode),
    #[error("catalog body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where the catalog in use came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    Remote,
    Fallback,
}

impl CatalogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogSource::Remote => "remote",
            CatalogSource::Fallback => "fallback",
        }
    }
}

/// Fixed substitute used whenever the endpoint is unusable.
pub fn fallback_catalog() -> CatalogPayload {
    let item = |sku: &str, title: &str, price: &str| RawProduct {
        sku: None,
        sku_upper: Some(Value::from(sku)),
        title: Some(Value::from(title)),
        price: Some(Value::from(price)),
    };
    CatalogPayload {
        currency: Some(DEFAULT_CURRENCY.to_string()),
        products: Some(vec![
            item("0K3QOSOV4V", "iFhone 13 Pro", "938.99"),
            item("TGD5XORY1L", "Cargador", "49.99"),
            item("IOKW9BQ9F3", "Funda de piel", "79.99"),
        ]),
    }
}

pub struct CatalogClient {
    http: reqwest::Client,
    url: Url,
}

impl CatalogClient {
    /// `timeout` of `None` means wait as long as the server takes.
    pub fn new(url: Url, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-store"));
        headers.insert(header::PRAGMA, header::HeaderValue::from_static("no-cache"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self { http: builder.build()?, url })
    }

    pub async fn fetch(&self) -> Result<CatalogPayload, FetchError> {
        debug!(url = %self.url, "fetching catalog");
        let rsp = self.http.get(self.url.clone()).send().await?;
        let status = rsp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = rsp.bytes().await?;
        Ok(serde_json::from_slice::<CatalogPayload>(&body)?)
    }

    /// Never fails: any fetch error is logged and the fallback is returned.
    pub async fn load(&self) -> (CatalogPayload, CatalogSource) {
        let (payload, source) = match self.fetch().await {
            Ok(p) => (p, CatalogSource::Remote),
            Err(e) => {
                warn!(error = %e, url = %self.url, "catalog fetch failed, using FALLBACK");
                (fallback_catalog(), CatalogSource::Fallback)
            }
        };
        record_load(&payload, source);
        (payload, source)
    }
}

/// Counter + `catalog loaded` event, shared by the fetch and offline paths.
pub fn record_load(payload: &CatalogPayload, source: CatalogSource) {
    CATALOG_LOADS.with_label_values(&[source.as_str()]).inc();
    info!(
        source = source.as_str(),
        products = payload.products.as_ref().map_or(0, Vec::len),
        "catalog loaded"
    );
}

/// Number or numeric string -> finite f64, anything else -> 0.
pub fn as_number(v: Option<&Value>) -> f64 {
    let n = match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_float_prefix(s),
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

// parseFloat-style: longest leading decimal literal, "12.5abc" -> 12.5
fn parse_float_prefix(s: &str) -> f64 {
    let t = s.trim_start();
    let b = t.as_bytes();
    let mut end = 0;
    if end < b.len() && (b[end] == b'+' || b[end] == b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < b.len() && b[end].is_ascii_digit() {
        end += 1;
    }
    if end < b.len() && b[end] == b'.' {
        end += 1;
        while end < b.len() && b[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &t[digits_start..end] == "." {
        return f64::NAN;
    }
    // optional exponent, only if it has digits
    if end < b.len() && (b[end] == b'e' || b[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < b.len() && (b[exp_end] == b'+' || b[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < b.len() && b[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    t[..end].parse::<f64>().unwrap_or(f64::NAN)
}

fn sku_of(p: &RawProduct) -> Option<String> {
    // `SKU` menang kalau dua-duanya ada; null dianggap tidak ada
    [p.sku_upper.as_ref(), p.sku.as_ref()]
        .into_iter()
        .flatten()
        .find(|v| !v.is_null())
        .and_then(scalar_text)
}

/// Applied once at the boundary; nothing downstream sees `RawProduct`.
/// `currency_override` wins over the payload's own label.
pub fn normalize(payload: &CatalogPayload, currency_override: Option<&str>) -> Catalog {
    let currency = currency_override
        .filter(|c| !c.is_empty())
        .or(payload.currency.as_deref().filter(|c| !c.is_empty()))
        .unwrap_or(DEFAULT_CURRENCY)
        .to_string();

    let products = payload
        .products
        .iter()
        .flatten()
        .map(|p| LineInput {
            sku: sku_of(p),
            title: p.title.as_ref().and_then(scalar_text).unwrap_or_default(),
            price: PriceInput::Number(as_number(p.price.as_ref())),
            quantity: Some(0.0),
        })
        .collect();

    Catalog { currency, products }
}
