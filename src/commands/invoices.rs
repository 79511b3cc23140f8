use anyhow::{anyhow, Result};

use crate::models::{Invoice, InvoiceSummary, Ledger, LineItem};
use crate::utils::parse_decimal;

pub fn invoice_summary(ledger: &Ledger, invoice: &Invoice) -> InvoiceSummary {
    InvoiceSummary {
        id: invoice.id.clone(),
        number: invoice.number.clone(),
        date: invoice.date,
        client_name: ledger.client(&invoice.client_id).map(|client| client.name.clone()),
        description: invoice.description.clone(),
        total: invoice.total,
        balance: invoice.balance(),
        status: invoice.status(),
    }
}

/// Invoices, newest first, optionally only those still open.
pub fn get_invoices(ledger: &Ledger, open_only: bool) -> Vec<InvoiceSummary> {
    ledger
        .invoices
        .iter()
        .rev()
        .filter(|invoice| !open_only || invoice.is_open())
        .map(|invoice| invoice_summary(ledger, invoice))
        .collect()
}

/// Finds an invoice by id or by its printed number.
pub fn resolve_invoice<'a>(ledger: &'a Ledger, key: &str) -> Option<&'a Invoice> {
    let key = key.trim();
    ledger
        .invoice(key)
        .or_else(|| ledger.invoice_by_number(key))
        .or_else(|| {
            // "17" for "00000017"
            key.parse::<u64>()
                .ok()
                .and_then(|number| ledger.invoice_by_number(&format!("{:08}", number)))
        })
}

/// Parses `description:quantity:unit_price`. The description may itself
/// contain colons.
pub fn parse_line_item(value: &str) -> Result<LineItem> {
    let mut parts = value.rsplitn(3, ':');
    let price = parts.next().ok_or_else(|| anyhow!("Missing unit price in {:?}", value))?;
    let quantity = parts
        .next()
        .ok_or_else(|| anyhow!("Expected description:quantity:price, got {:?}", value))?;
    let description = parts.next().unwrap_or_default();
    Ok(LineItem {
        description: description.trim().to_string(),
        quantity: parse_decimal(quantity)?,
        unit_price: parse_decimal(price)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, NewInvoice};
    use crate::services::invoicing::{build_invoice, commit_invoice};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn line_items_parse_from_text() {
        let item = parse_line_item("Plano: planta baja:2:500,50").unwrap();
        assert_eq!(item.description, "Plano: planta baja");
        assert_eq!(item.quantity, dec!(2));
        assert_eq!(item.unit_price, dec!(500.50));

        let item = parse_line_item("3:100").unwrap();
        assert_eq!(item.description, "");
        assert!(parse_line_item("100").is_err());
        assert!(parse_line_item("Visita:uno:100").is_err());
    }

    #[test]
    fn invoices_resolve_by_id_or_number() {
        let mut ledger = Ledger::default();
        ledger.clients.push(Client {
            id: "c-1".to_string(),
            name: "Acme".to_string(),
            tax_id: None,
            email: None,
            phone: None,
            address: None,
        });
        let invoice = build_invoice(
            &ledger,
            NewInvoice {
                client_id: "c-1".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                description: String::new(),
                line_items: vec![parse_line_item("Visita:1:100").unwrap()],
                tax_rate: dec!(21),
            },
        )
        .unwrap();
        let id = invoice.id.clone();
        commit_invoice(&mut ledger, invoice);

        assert_eq!(resolve_invoice(&ledger, &id).unwrap().number, "00000001");
        assert_eq!(resolve_invoice(&ledger, "00000001").unwrap().id, id);
        assert_eq!(resolve_invoice(&ledger, "1").unwrap().id, id);
        assert!(resolve_invoice(&ledger, "2").is_none());
        assert_eq!(get_invoices(&ledger, true).len(), 1);
        assert_eq!(get_invoices(&ledger, false)[0].client_name.as_deref(), Some("Acme"));
    }
}
