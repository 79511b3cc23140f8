use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ValidationError;
use crate::models::{Invoice, Ledger, LineItem, NewInvoice};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Subtotal, tax rounded to cents and total. Fails with
/// [`ValidationError::AmountOverflow`] when any step leaves the `Decimal` range.
pub fn compute_totals(line_items: &[LineItem], tax_rate: Decimal) -> Result<Totals, ValidationError> {
    let subtotal = line_items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.amount()?))
        .ok_or(ValidationError::AmountOverflow)?;
    let tax = subtotal
        .checked_mul(tax_rate)
        .and_then(|taxed| taxed.checked_div(HUNDRED))
        .ok_or(ValidationError::AmountOverflow)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let total = subtotal
        .checked_add(tax)
        .ok_or(ValidationError::AmountOverflow)?;
    Ok(Totals { subtotal, tax, total })
}

/// Validates a new invoice against the ledger and builds it with the next
/// invoice number. The ledger is only read; committing the invoice and
/// advancing the counter is [`commit_invoice`]'s job.
pub fn build_invoice(ledger: &Ledger, draft: NewInvoice) -> Result<Invoice, ValidationError> {
    if ledger.client(&draft.client_id).is_none() {
        return Err(ValidationError::UnknownClient(draft.client_id));
    }
    if draft.tax_rate < Decimal::ZERO {
        return Err(ValidationError::NegativeTaxRate(draft.tax_rate));
    }
    if let Some(index) = draft
        .line_items
        .iter()
        .position(|item| item.quantity < Decimal::ZERO || item.unit_price < Decimal::ZERO)
    {
        return Err(ValidationError::NegativeLineItem(index + 1));
    }
    let billable = draft
        .line_items
        .iter()
        .any(|item| item.quantity > Decimal::ZERO && item.unit_price > Decimal::ZERO);
    if !billable {
        return Err(ValidationError::EmptyLineItems);
    }

    let totals = compute_totals(&draft.line_items, draft.tax_rate)?;
    Ok(Invoice::issue(
        uuid::Uuid::new_v4().to_string(),
        ledger.sequence_counters.invoice_number(),
        draft.client_id,
        draft.date,
        draft.description.trim().to_string(),
        draft.line_items,
        draft.tax_rate,
        totals.subtotal,
        totals.tax,
        totals.total,
    ))
}

pub fn commit_invoice(ledger: &mut Ledger, invoice: Invoice) {
    ledger.sequence_counters.invoice += 1;
    ledger.invoices.push(invoice);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, InvoiceStatus};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ledger() -> Ledger {
        let mut ledger = Ledger::default();
        ledger.clients.push(Client {
            id: "c-1".to_string(),
            name: "Acme".to_string(),
            tax_id: None,
            email: Some("a@x.com".to_string()),
            phone: None,
            address: None,
        });
        ledger
    }

    fn item(quantity: Decimal, unit_price: Decimal) -> LineItem {
        LineItem {
            description: "Relevamiento topográfico".to_string(),
            quantity,
            unit_price,
        }
    }

    fn draft(line_items: Vec<LineItem>, tax_rate: Decimal) -> NewInvoice {
        NewInvoice {
            client_id: "c-1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            description: "Servicio de ingeniería".to_string(),
            line_items,
            tax_rate,
        }
    }

    #[test]
    fn totals_include_tax() {
        let invoice = build_invoice(&ledger(), draft(vec![item(dec!(2), dec!(500))], dec!(21))).unwrap();
        assert_eq!(invoice.subtotal, dec!(1000));
        assert_eq!(invoice.tax, dec!(210));
        assert_eq!(invoice.total, dec!(1210));
        assert_eq!(invoice.balance(), dec!(1210));
        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert_eq!(invoice.number, "00000001");
    }

    #[test]
    fn tax_is_rounded_to_cents() {
        let totals = compute_totals(&[item(dec!(1), dec!(10.05))], dec!(10.5)).unwrap();
        assert_eq!(totals.tax, dec!(1.06));
        assert_eq!(totals.total, dec!(11.11));
    }

    #[test]
    fn zero_value_lines_are_not_billable() {
        let err = build_invoice(&ledger(), draft(vec![item(dec!(0), dec!(500))], dec!(21))).unwrap_err();
        assert_eq!(err, ValidationError::EmptyLineItems);
        let err = build_invoice(&ledger(), draft(Vec::new(), dec!(21))).unwrap_err();
        assert_eq!(err, ValidationError::EmptyLineItems);
    }

    #[test]
    fn negative_inputs_are_rejected() {
        let err = build_invoice(
            &ledger(),
            draft(vec![item(dec!(1), dec!(100)), item(dec!(-1), dec!(20))], dec!(21)),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::NegativeLineItem(2));

        let err = build_invoice(&ledger(), draft(vec![item(dec!(1), dec!(100))], dec!(-5))).unwrap_err();
        assert_eq!(err, ValidationError::NegativeTaxRate(dec!(-5)));
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let err = compute_totals(&[item(dec!(2), Decimal::MAX)], dec!(21)).unwrap_err();
        assert_eq!(err, ValidationError::AmountOverflow);

        let err = build_invoice(&ledger(), draft(vec![item(dec!(1), Decimal::MAX)], dec!(21))).unwrap_err();
        assert_eq!(err, ValidationError::AmountOverflow);

        let err = build_invoice(
            &ledger(),
            draft(vec![item(dec!(1), Decimal::MAX), item(dec!(1), Decimal::MAX)], dec!(0)),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::AmountOverflow);
    }

    #[test]
    fn unknown_client_is_rejected() {
        let mut invoice = draft(vec![item(dec!(1), dec!(100))], dec!(21));
        invoice.client_id = "nobody".to_string();
        let err = build_invoice(&ledger(), invoice).unwrap_err();
        assert_eq!(err, ValidationError::UnknownClient("nobody".to_string()));
    }

    #[test]
    fn commit_advances_the_counter_once() {
        let mut ledger = ledger();
        let first = build_invoice(&ledger, draft(vec![item(dec!(1), dec!(100))], dec!(0))).unwrap();
        commit_invoice(&mut ledger, first);
        let second = build_invoice(&ledger, draft(vec![item(dec!(1), dec!(100))], dec!(0))).unwrap();
        assert_eq!(second.number, "00000002");
        commit_invoice(&mut ledger, second);
        assert_eq!(ledger.sequence_counters.invoice, 3);
        assert_eq!(ledger.invoices.len(), 2);
    }
}
