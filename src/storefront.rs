// ===============================
// src/storefront.rs (view + input wiring)
// ===============================
//
// Owns the one ledger and the output handle. Input lines play the role of
// the per-product quantity controls:
//   <sku> <value>   set quantity (parseInt-style, clamped to >= 0)
//   show <sku>      one row, read-only
//   list | total    re-render
//   quit | exit     end session
//
use std::io::{self, Write};

use tracing::{debug, error, warn};

use crate::domain::{Catalog, CartSummary, ProductSnapshot, RequestedQuantity};
use crate::ledger::CartLedger;
use crate::metrics::{CART_LINES, CART_TOTAL_CENTS, QTY_UPDATES, UNKNOWN_SKU};

pub const EMPTY_CATALOG_MSG: &str = "No hay productos.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Storefront<W: Write> {
    catalog: Catalog,
    ledger: CartLedger,
    out: W,
}

impl<W: Write> Storefront<W> {
    pub fn new(catalog: Catalog, out: W) -> Self {
        let mut ledger = CartLedger::new(catalog.currency.clone(), catalog.products.iter().cloned());
        // semua kontrol mulai dari 0, sekali saja saat init
        let skus: Vec<String> = ledger.summary().lines.into_iter().map(|l| l.sku).collect();
        for sku in &skus {
            if let Err(e) = ledger.set_quantity(sku, 0) {
                error!(error = %e, "initial quantity reset failed");
            }
        }
        if ledger.is_empty() {
            warn!("cart ledger has no product lines");
        }
        CART_LINES.set(ledger.len() as i64);
        Self { catalog, ledger, out }
    }

    pub fn summary(&self) -> CartSummary {
        self.ledger.summary()
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// One row block per catalog product, read from the ledger as it is now.
    /// Returns how many rows were rendered.
    pub fn render_products(&mut self) -> io::Result<usize> {
        if self.catalog.products.is_empty() {
            writeln!(self.out, "{EMPTY_CATALOG_MSG}")?;
            return Ok(0);
        }

        let mut rendered = 0;
        for i in 0..self.catalog.products.len() {
            let sku = self.catalog.products[i].sku.clone().unwrap_or_default();
            let Some(snap) = self.ledger.product(&sku) else {
                // baris tanpa SKU valid tidak punya kontrol
                error!(%sku, "row skipped, SKU not in ledger");
                continue;
            };
            self.write_row(&snap)?;
            rendered += 1;
        }
        self.out.flush()?;
        Ok(rendered)
    }

    fn write_row(&mut self, p: &ProductSnapshot) -> io::Result<()> {
        let currency = self.ledger.currency();
        writeln!(self.out, "{:<32} {:>10.2} {}", p.title, p.unit_price, currency)?;
        writeln!(self.out, "  SKU: {}", p.sku)?;
        writeln!(self.out, "  Unidades [qty-{}]: {}", p.sku, p.quantity)?;
        Ok(())
    }

    pub fn render_total(&mut self) -> io::Result<()> {
        let CartSummary { total, currency, .. } = self.ledger.summary();
        CART_TOTAL_CENTS.set((total * 100.0).round() as i64);
        writeln!(self.out, "Total: {total:.2} {currency}")?;
        self.out.flush()
    }

    /// Quantity control changed. Unknown SKU is logged and the display
    /// is left as it was.
    pub fn on_quantity_input(&mut self, sku: &str, raw: &str) -> io::Result<Option<ProductSnapshot>> {
        let requested = RequestedQuantity::Text(int_prefix(raw));
        match self.ledger.set_quantity(sku, requested) {
            Ok(snap) => {
                QTY_UPDATES.inc();
                debug!(sku = %snap.sku, qty = snap.quantity, "quantity updated");
                writeln!(self.out, "  Unidades [qty-{}]: {}", snap.sku, snap.quantity)?;
                self.render_total()?;
                Ok(Some(snap))
            }
            Err(e) => {
                UNKNOWN_SKU.inc();
                error!(error = %e, "quantity update rejected");
                Ok(None)
            }
        }
    }

    pub fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (None, _, _) => {}
            (Some("quit" | "exit"), None, _) => return Ok(Flow::Quit),
            (Some("list"), None, _) => {
                self.render_products()?;
                self.render_total()?;
            }
            (Some("total"), None, _) => self.render_total()?,
            (Some("show"), Some(sku), None) => match self.ledger.product(sku) {
                Some(snap) => self.write_row(&snap)?,
                None => writeln!(self.out, "  SKU desconocido: {sku}")?,
            },
            (Some(sku), Some(value), None) => {
                self.on_quantity_input(sku, value)?;
            }
            _ => warn!(%line, "unrecognised input, expected `<sku> <qty>`, `list`, `total` or `quit`"),
        }
        Ok(Flow::Continue)
    }
}

/// parseInt(value || "0", 10): leading `[+-]digits`, empty means "0",
/// no digits leaves nothing numeric (coerced to 0 downstream).
fn int_prefix(raw: &str) -> String {
    let t = raw.trim_start();
    if t.is_empty() {
        return "0".to_string();
    }
    let sign_len = usize::from(t.starts_with(['+', '-']));
    let digits = t[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return String::new();
    }
    t[..sign_len + digits].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{fallback_catalog, normalize, CatalogClient, CatalogSource};
    use crate::domain::{LineInput, PriceInput};
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog(lines: &[(&str, f64)]) -> Catalog {
        Catalog {
            currency: "€".into(),
            products: lines
                .iter()
                .map(|(sku, price)| LineInput {
                    sku: Some(sku.to_string()),
                    title: format!("Item {sku}"),
                    price: PriceInput::Number(*price),
                    quantity: Some(0.0),
                })
                .collect(),
        }
    }

    fn text(sf: Storefront<Vec<u8>>) -> String {
        String::from_utf8(sf.into_output()).unwrap()
    }

    #[test]
    fn int_prefix_matches_number_input_parsing() {
        assert_eq!(int_prefix(""), "0");
        assert_eq!(int_prefix("  12"), "12");
        assert_eq!(int_prefix("3.9"), "3");
        assert_eq!(int_prefix("-4"), "-4");
        assert_eq!(int_prefix("7abc"), "7");
        assert_eq!(int_prefix("abc"), "");
        assert_eq!(int_prefix("-"), "");
    }

    #[test]
    fn renders_rows_and_total() {
        let mut sf = Storefront::new(catalog(&[("A", 10.0), ("B", 5.5)]), Vec::new());
        assert_eq!(sf.render_products().unwrap(), 2);
        sf.render_total().unwrap();
        let out = text(sf);
        assert!(out.contains("Item A"));
        assert!(out.contains("10.00 €"));
        assert!(out.contains("  SKU: B"));
        assert!(out.contains("5.50 €"));
        assert!(out.contains("Unidades [qty-A]: 0"));
        assert!(out.ends_with("Total: 0.00 €\n"));
    }

    #[test]
    fn empty_catalog_shows_message() {
        let mut sf = Storefront::new(catalog(&[]), Vec::new());
        assert_eq!(sf.render_products().unwrap(), 0);
        assert!(text(sf).starts_with(EMPTY_CATALOG_MSG));
    }

    #[test]
    fn input_updates_ledger_and_total() {
        let mut sf = Storefront::new(catalog(&[("A", 10.0), ("B", 5.5)]), Vec::new());
        sf.render_products().unwrap();

        assert_eq!(sf.handle_line("A 3").unwrap(), Flow::Continue);
        assert_eq!(sf.summary().total, 30.00);
        sf.handle_line("B 2").unwrap();
        assert_eq!(sf.summary().total, 41.00);
        sf.handle_line("A -5").unwrap();
        assert_eq!(sf.ledger.product("A").unwrap().quantity, 0);
        assert_eq!(sf.summary().total, 11.00);
        sf.handle_line("B oops").unwrap();
        assert_eq!(sf.ledger.product("B").unwrap().quantity, 0);

        let out = text(sf);
        assert!(out.contains("Total: 30.00 €"));
        assert!(out.contains("Total: 41.00 €"));
        assert!(out.contains("Total: 11.00 €"));
        assert!(out.ends_with("Total: 0.00 €\n"));
    }

    #[test]
    fn list_rerenders_without_touching_the_cart() {
        let mut sf = Storefront::new(normalize(&fallback_catalog(), None), Vec::new());
        sf.render_products().unwrap();
        sf.handle_line("TGD5XORY1L 2").unwrap();
        let before = sf.summary();
        assert_eq!(before.total, 99.98);

        assert_eq!(sf.handle_line("list").unwrap(), Flow::Continue);
        assert_eq!(sf.summary(), before);
        let out = text(sf);
        assert!(out.contains("Unidades [qty-TGD5XORY1L]: 2"));
        assert!(out.ends_with("Total: 99.98 €\n"));
    }

    #[test]
    fn initial_quantities_start_at_zero() {
        let mut cat = catalog(&[("A", 3.0)]);
        cat.products[0].quantity = Some(4.0);
        let sf = Storefront::new(cat, Vec::new());
        assert_eq!(sf.ledger.product("A").unwrap().quantity, 0);
        assert_eq!(sf.summary().total, 0.00);
    }

    #[test]
    fn unknown_sku_leaves_display_unchanged() {
        let mut sf = Storefront::new(catalog(&[("A", 10.0)]), Vec::new());
        sf.handle_line("A 1").unwrap();
        let before = sf.summary();

        let snap = sf.on_quantity_input("Z", "1").unwrap();
        assert!(snap.is_none());
        assert_eq!(sf.summary(), before);
        let out = text(sf);
        assert!(!out.contains("qty-Z"));
        assert_eq!(out.matches("Total:").count(), 1);
    }

    #[test]
    fn rows_without_sku_are_not_rendered() {
        let mut cat = catalog(&[("A", 1.0)]);
        cat.products.push(LineInput { sku: Some(String::new()), title: "ghost".into(), price: PriceInput::Number(1.0), quantity: Some(5.0) });
        let mut sf = Storefront::new(cat, Vec::new());
        assert_eq!(sf.ledger.len(), 1);
        assert_eq!(sf.render_products().unwrap(), 1);
        assert!(!text(sf).contains("ghost"));
    }

    #[test]
    fn commands() {
        let mut sf = Storefront::new(catalog(&[("A", 2.0)]), Vec::new());
        assert_eq!(sf.handle_line("").unwrap(), Flow::Continue);
        assert_eq!(sf.handle_line("what is this").unwrap(), Flow::Continue);
        assert_eq!(sf.handle_line("total").unwrap(), Flow::Continue);
        assert_eq!(sf.handle_line("show A").unwrap(), Flow::Continue);
        assert_eq!(sf.handle_line("show Z").unwrap(), Flow::Continue);
        assert_eq!(sf.handle_line("list").unwrap(), Flow::Continue);
        assert_eq!(sf.handle_line("quit").unwrap(), Flow::Quit);
        assert_eq!(sf.handle_line("exit").unwrap(), Flow::Quit);
        let out = text(sf);
        assert_eq!(out.matches("Total: 0.00 €").count(), 2);
        assert!(out.contains("Item A"));
        assert!(out.contains("SKU desconocido: Z"));
    }

    #[test]
    fn fallback_catalog_renders_three_rows() {
        let mut sf = Storefront::new(normalize(&fallback_catalog(), None), Vec::new());
        assert_eq!(sf.render_products().unwrap(), 3);
        sf.render_total().unwrap();
        assert_eq!(sf.summary().total, 0.00);
        let out = text(sf);
        assert!(out.contains("iFhone 13 Pro"));
        assert!(out.contains("938.99 €"));
        assert!(out.contains("Funda de piel"));
    }

    #[tokio::test]
    async fn failed_fetch_starts_from_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = CatalogClient::new(Url::parse(&server.uri()).unwrap(), Some(Duration::from_secs(2))).unwrap();
        let (payload, source) = client.load().await;
        assert_eq!(source, CatalogSource::Fallback);

        let mut sf = Storefront::new(normalize(&payload, None), Vec::new());
        assert_eq!(sf.render_products().unwrap(), 3);
        sf.render_total().unwrap();
        assert_eq!(sf.summary().total, 0.00);
        assert!(text(sf).ends_with("Total: 0.00 €\n"));
    }
}
