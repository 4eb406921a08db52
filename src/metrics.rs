// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Catalog --------
pub static CATALOG_LOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("catalog_loads_total", "catalog loads by source (label: source)"),
        &["source"],
    )
    .unwrap()
});

// -------- Cart --------
pub static QTY_UPDATES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("cart_quantity_updates_total", "accepted quantity updates").unwrap()
});

pub static UNKNOWN_SKU: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("cart_unknown_sku_total", "quantity updates rejected for unknown SKU").unwrap()
});

pub static CART_LINES: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("cart_lines", "product lines in the ledger").unwrap());

pub static CART_TOTAL_CENTS: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("cart_total_cents", "current cart total (cents)").unwrap());

// ---- Config visibility ----
pub static CONFIG_CURRENCY: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("config_currency", "currency label in use (label: currency)"),
        &["currency"],
    )
    .unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(CATALOG_LOADS.clone())),
        REGISTRY.register(Box::new(QTY_UPDATES.clone())),
        REGISTRY.register(Box::new(UNKNOWN_SKU.clone())),
        REGISTRY.register(Box::new(CART_LINES.clone())),
        REGISTRY.register(Box::new(CART_TOTAL_CENTS.clone())),
        REGISTRY.register(Box::new(CONFIG_CURRENCY.clone())),
    ] {
        let _ = m;
    }
}

fn encode_metrics() -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buf) {
        tracing::warn!(?e, "metrics encode failed");
        buf.clear();
    }
    if buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

// "GET /metrics HTTP/1.1" -> "/metrics"
fn request_path(head: &[u8]) -> Option<&str> {
    let line = std::str::from_utf8(head).ok()?.lines().next()?;
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(path)) => Some(path),
        _ => None,
    }
}

fn respond(stream: &mut TcpStream, status: &str, body: &[u8]) -> io::Result<()> {
    write!(
        stream,
        "HTTP/1.1 {status}\r\nContent-Type: text/plain; version=0.0.4; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )?;
    stream.write_all(body)?;
    stream.flush()
}

// Only `GET /` and `GET /metrics` are answered with the registry.
fn handle_client(mut stream: TcpStream) {
    let mut head = [0u8; 1024];
    let n = match stream.read(&mut head) {
        Ok(n) => n,
        Err(e) => {
            tracing::debug!(?e, "metrics read failed");
            return;
        }
    };

    let result = match request_path(&head[..n]) {
        Some("/" | "/metrics") => respond(&mut stream, "200 OK", &encode_metrics()),
        _ => respond(&mut stream, "404 Not Found", b"not found\n"),
    };
    if let Err(e) = result {
        tracing::warn!(?e, "metrics write failed");
    }
}

/// Bind on the caller's thread so a busy port surfaces as an error,
/// then serve from a dedicated OS thread (keeps Tokio runtime clean).
pub fn serve_metrics(port: u16) -> io::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)?;
    tracing::info!(%addr, "metrics listening (/ and /metrics)");

    thread::spawn(move || {
        for conn in listener.incoming() {
            match conn {
                Ok(stream) => handle_client(stream),
                Err(e) => tracing::warn!(?e, "metrics accept error"),
            }
        }
    });
    Ok(())
}
