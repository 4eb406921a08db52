// ===============================
// src/ledger.rs (cart ledger: SKU -> price/qty, totals)
// ===============================
use ahash::RandomState;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::warn;

use crate::domain::{CartSummary, LineInput, PriceInput, ProductSnapshot, RequestedQuantity};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("SKU not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone)]
struct ProductLine {
    sku: String,
    title: String,
    unit_price: f64,
    quantity: u32,
}

impl ProductLine {
    fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            sku: self.sku.clone(),
            title: self.title.clone(),
            unit_price: self.unit_price,
            quantity: self.quantity,
        }
    }
}

/// In-memory cart. Lines are fixed at construction, only quantities move.
#[derive(Debug, Clone)]
pub struct CartLedger {
    currency: String,
    lines: IndexMap<String, ProductLine, RandomState>,
}

impl CartLedger {
    pub fn new(currency: impl Into<String>, initial: impl IntoIterator<Item = LineInput>) -> Self {
        let mut lines: IndexMap<String, ProductLine, RandomState> = IndexMap::default();
        for input in initial {
            let sku = match input.sku {
                Some(s) if !s.is_empty() => s,
                _ => continue, // tanpa SKU -> buang diam-diam
            };
            let unit_price = coerce_price(&sku, &input.price);
            let quantity = input
                .quantity
                .map(|q| RequestedQuantity::Number(q).effective())
                .unwrap_or(0);
            // duplicate SKU: last data wins, first position kept
            lines.insert(
                sku.clone(),
                ProductLine { sku, title: input.title, unit_price, quantity },
            );
        }
        Self { currency: currency.into(), lines }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Strict: unknown SKU is a caller bug and is reported, never ignored.
    pub fn set_quantity(
        &mut self,
        sku: &str,
        requested: impl Into<RequestedQuantity>,
    ) -> Result<ProductSnapshot, LedgerError> {
        let line = self
            .lines
            .get_mut(sku)
            .ok_or_else(|| LedgerError::NotFound(sku.to_string()))?;
        line.quantity = requested.into().effective();
        Ok(line.snapshot())
    }

    /// Forgiving read: unknown SKU is just `None`.
    pub fn product(&self, sku: &str) -> Option<ProductSnapshot> {
        self.lines.get(sku).map(ProductLine::snapshot)
    }

    pub fn summary(&self) -> CartSummary {
        let lines: Vec<ProductSnapshot> = self.lines.values().map(ProductLine::snapshot).collect();
        let raw: f64 = lines.iter().map(|p| p.unit_price * p.quantity as f64).sum();
        CartSummary { total: round_cents(raw), currency: self.currency.clone(), lines }
    }
}

/// Round to 2 decimals (half away from zero; values here are never negative).
pub fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn coerce_price(sku: &str, price: &PriceInput) -> f64 {
    let n = match price {
        PriceInput::Number(n) => *n,
        PriceInput::Text(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
    };
    if n.is_finite() && n >= 0.0 {
        n
    } else {
        warn!(%sku, ?price, "invalid unit price, using 0");
        0.0
    }
}
