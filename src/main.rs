// ===============================
// src/main.rs
// ===============================
/*
 # jalankan (offline, pakai katalog FALLBACK)
 cargo run -- --offline

 # katalog sendiri + metrics
 CATALOG_URL=http://localhost:8080/products METRICS_PORT=9898 cargo run
 curl -s localhost:9898/metrics | egrep '^(catalog_loads_total|cart_total_cents)'
*/
/*
=============================================================================
Project : storefront_cart — terminal storefront with an in-memory cart ledger
Module  : main.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Fetches a product catalog over HTTP (fixed fallback on failure),
          renders one row per product with an editable quantity, keeps a
          running cart total, and optionally exposes Prometheus metrics.
=============================================================================
*/
mod catalog;
mod config;
mod domain;
mod ledger;
mod metrics;
mod storefront;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::catalog::{fallback_catalog, CatalogClient, CatalogSource};
use crate::storefront::{Flow, Storefront};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---- Logging (stderr, stdout is the storefront) ----
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // ---- Load config ----
    let args = config::load();
    info!(
        catalog_url = %args.catalog_url,
        timeout_secs = args.catalog_timeout_secs,
        currency = ?args.currency,
        metrics_port = ?args.metrics_port,
        offline = args.offline,
        "startup config"
    );

    // ---- Metrics (optional) ----
    metrics::init();
    if let Some(port) = args.metrics_port {
        metrics::serve_metrics(port).with_context(|| format!("metrics bind on port {port}"))?;
    }

    // ---- Catalog: satu kali fetch, FALLBACK kalau gagal ----
    let (payload, source) = if args.offline {
        let payload = fallback_catalog();
        catalog::record_load(&payload, CatalogSource::Fallback);
        (payload, CatalogSource::Fallback)
    } else {
        let client = CatalogClient::new(args.catalog_url.clone(), args.catalog_timeout())
            .context("building catalog HTTP client")?;
        client.load().await
    };
    let catalog = catalog::normalize(&payload, args.currency.as_deref());
    metrics::CONFIG_CURRENCY.with_label_values(&[catalog.currency.as_str()]).set(1);

    // ---- View ----
    let mut shop = Storefront::new(catalog, std::io::stdout());
    let rows = shop.render_products()?;
    shop.render_total()?;
    info!(rows, source = source.as_str(), "storefront ready, type `<sku> <qty>`, `list`, `total` or `quit`");

    // ---- Input loop ----
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("reading stdin")? {
                    Some(l) => {
                        if shop.handle_line(&l)? == Flow::Quit {
                            break;
                        }
                    }
                    None => break, // EOF
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c");
                break;
            }
        }
    }

    let summary = shop.summary();
    info!(
        total = summary.total,
        currency = %summary.currency,
        items = summary.lines.iter().map(|l| l.quantity as u64).sum::<u64>(),
        "session ended"
    );
    Ok(())
}
