//! Presentation seam - turns read-only snapshots into markup.
//!
//! The endpoints ask a [`Presenter`] for a fresh rendering on every request and
//! never hand it mutable state. [`HtmlPresenter`] is deliberately plain; a
//! deployment that wants styled pages swaps in its own implementation.

use crate::core::snapshot::{CartSnapshot, SalesReport};
use std::fmt::Write;

/// Renders pages from snapshots. Implementations must not hold register state.
pub trait Presenter: Send + Sync {
    /// Static shell of the sale page; it pulls `/content` itself.
    fn sale_page(&self) -> String;

    /// Products, cart quantities and totals.
    fn cart_fragment(&self, cart: &CartSnapshot) -> String;

    /// Cumulative sales with export and reset actions.
    fn sales_page(&self, sales: &SalesReport) -> String;

    /// Editable catalog form.
    fn admin_page(&self, catalog: &CartSnapshot) -> String;
}

/// Unstyled HTML pages driven by small inline scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPresenter;

const SALE_SHELL: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Register</title>
<script>
function updateContent() {
  fetch('/content').then(r => r.text()).then(html => {
    document.getElementById('content').innerHTML = html;
  });
}
function sendAction(action, id, quantity = 1) {
  fetch(`/${action}?id=${id}&quantity=${quantity}`).then(() => updateContent());
}
window.onload = updateContent;
</script>
</head>
<body>
<h1>Register</h1>
<div id="content">Loading products...</div>
</body>
</html>
"#;

impl Presenter for HtmlPresenter {
    fn sale_page(&self) -> String {
        SALE_SHELL.to_string()
    }

    fn cart_fragment(&self, cart: &CartSnapshot) -> String {
        let mut html = String::new();
        for line in &cart.lines {
            let deposit = if line.has_deposit {
                format!(" + {} deposit", cart.deposit_unit)
            } else {
                String::new()
            };
            let _ = write!(
                html,
                "<div class='product'><p><strong>{}</strong> ({}{deposit})</p>\
                 <span>Qty: {}</span>",
                escape(&line.name),
                line.price,
                line.quantity,
            );
            for step in 1..=3 {
                let _ = write!(
                    html,
                    "<button onclick='sendAction(\"add\", {}, {step})'>+{step}</button>",
                    line.index
                );
            }
            let _ = write!(
                html,
                "<button onclick='sendAction(\"remove\", {})'>-1</button></div>",
                line.index
            );
        }
        let _ = write!(
            html,
            "<h3>Total: {}<br><small>(incl. {} deposit)</small></h3>\
             <button onclick='sendAction(\"submit\", -1)'>Complete sale</button>\
             <button onclick='sendAction(\"clear\", -1)'>Clear cart</button>",
            cart.total, cart.deposit_total
        );
        html
    }

    fn sales_page(&self, sales: &SalesReport) -> String {
        let mut html =
            String::from("<h1>Sales</h1><table border='1'><tr><th>Product</th><th>Sold</th></tr>");
        for row in &sales.rows {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(&row.name),
                row.sold
            );
        }
        html.push_str(
            "</table>\
             <form action='/exportSales' method='post'><button type='submit'>Export CSV</button></form>\
             <form action='/resetSales' method='post'><button type='submit'>Reset sales</button></form>",
        );
        html
    }

    fn admin_page(&self, catalog: &CartSnapshot) -> String {
        let mut html = String::from(
            "<!DOCTYPE html><html><head><meta charset='UTF-8'><title>Configuration</title></head>\
             <body><h1>Products</h1><form method='POST' action='/saveConfig'>",
        );
        for line in &catalog.lines {
            let i = line.index;
            let checked = if line.has_deposit { " checked" } else { "" };
            let _ = write!(
                html,
                "<div class='product-config'>\
                 <label>Name <input type='text' name='name_{i}' value='{}'></label>\
                 <label>Price <input type='number' step='0.01' name='price_{i}' value='{}'></label>\
                 <label>Deposit <input type='checkbox' name='deposit_{i}'{checked}></label>\
                 <button type='button' onclick='deleteProduct({i})'>Delete</button></div>",
                escape(&line.name),
                line.price,
            );
        }
        if catalog.capacity_left > 0 {
            html.push_str(
                "<h2>New product</h2>\
                 <label>Name <input type='text' name='new_name'></label>\
                 <label>Price <input type='number' step='0.01' name='new_price'></label>\
                 <label>Deposit <input type='checkbox' name='new_deposit'></label>",
            );
        }
        html.push_str(
            "<input type='submit' value='Save'></form>\
             <script>function deleteProduct(id){fetch('/deleteProduct?id='+id).then(()=>location.reload());}</script>\
             </body></html>",
        );
        html
    }
}

/// Escapes text for use in element content and single- or double-quoted attributes.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{ledger::SalesRow, money::Money, snapshot::CartLine},
        storage::layout::MAX_PRODUCTS,
    };

    fn cart() -> CartSnapshot {
        CartSnapshot {
            lines: vec![CartLine {
                index: 0,
                name: "Kaffee & <Kuchen>".to_string(),
                price: Money::from_cents(350),
                has_deposit: true,
                quantity: 2,
            }],
            total: Money::from_cents(900),
            deposit_total: Money::from_cents(200),
            deposit_unit: Money::from_cents(100),
            capacity_left: MAX_PRODUCTS - 1,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b>&'\""), "a&lt;b&gt;&amp;&#39;&quot;");
    }

    #[test]
    fn test_cart_fragment_shows_totals_and_escapes_names() {
        let html = HtmlPresenter.cart_fragment(&cart());
        assert!(html.contains("Kaffee &amp; &lt;Kuchen&gt;"));
        assert!(html.contains("3.50 + 1.00 deposit"));
        assert!(html.contains("Total: 9.00"));
        assert!(html.contains("incl. 2.00 deposit"));
        assert!(html.contains("sendAction(\"add\", 0, 3)"));
    }

    #[test]
    fn test_admin_page_keys_fields_by_slot() {
        let html = HtmlPresenter.admin_page(&cart());
        assert!(html.contains("name='name_0'"));
        assert!(html.contains("name='price_0' value='3.50'"));
        assert!(html.contains("name='deposit_0' checked"));
        assert!(html.contains("name='new_name'"));

        let mut full = cart();
        full.capacity_left = 0;
        assert!(!HtmlPresenter.admin_page(&full).contains("new_name"));
    }

    #[test]
    fn test_sales_page_lists_rows() {
        let html = HtmlPresenter.sales_page(&SalesReport {
            rows: vec![SalesRow {
                name: "Bier".to_string(),
                sold: 12,
            }],
        });
        assert!(html.contains("<tr><td>Bier</td><td>12</td></tr>"));
        assert!(html.contains("/resetSales"));
    }
}
