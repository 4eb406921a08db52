// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : storefront_cart — terminal storefront with an in-memory cart ledger
Module  : config.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Fetches a product catalog over HTTP (fixed fallback on failure),
          renders one row per product with an editable quantity, keeps a
          running cart total, and optionally exposes Prometheus metrics.
=============================================================================
*/
use std::time::Duration;

use clap::Parser;
use dotenvy::dotenv;
use url::Url;

use crate::catalog::DEFAULT_CATALOG_URL;

#[derive(Clone, Debug, Parser)]
#[command(name = "storefront_cart", version, about = "Terminal storefront with a running cart total")]
pub struct Args {
    /// Catalog endpoint (JSON: { currency?, products: [{ SKU|sku, title, price }] })
    #[arg(long, env = "CATALOG_URL", default_value = DEFAULT_CATALOG_URL)]
    pub catalog_url: Url,

    /// Fetch timeout in seconds; 0 = no timeout
    #[arg(long, env = "CATALOG_TIMEOUT_SECS", default_value_t = 10)]
    pub catalog_timeout_secs: u64,

    /// Currency label; overrides whatever the catalog says
    #[arg(long, env = "CURRENCY")]
    pub currency: Option<String>,

    /// Serve Prometheus metrics on this port (disabled if unset)
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Skip the fetch, start from the fallback catalog
    #[arg(long, env = "OFFLINE", default_value_t = false)]
    pub offline: bool,
}

impl Args {
    pub fn catalog_timeout(&self) -> Option<Duration> {
        match self.catalog_timeout_secs {
            0 => None,
            s => Some(Duration::from_secs(s)),
        }
    }
}

pub fn load() -> Args {
    // Pastikan .env dibaca dulu (agar CATALOG_URL, CURRENCY, dll ter-load)
    let _ = dotenv();
    Args::parse()
}
