use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::commands::invoices::resolve_invoice;
use crate::models::{AllocationDraft, Ledger, Receipt, ReceiptDraft, ReceiptSummary};
use crate::utils::parse_decimal;

pub fn receipt_summary(ledger: &Ledger, receipt: &Receipt) -> ReceiptSummary {
    ReceiptSummary {
        id: receipt.id.clone(),
        number: receipt.number.clone(),
        date: receipt.date,
        client_name: ledger.client(&receipt.client_id).map(|client| client.name.clone()),
        payment_method: receipt.payment_method.clone(),
        amount: receipt.amount,
    }
}

pub fn get_receipts(ledger: &Ledger) -> Vec<ReceiptSummary> {
    ledger
        .receipts
        .iter()
        .rev()
        .map(|receipt| receipt_summary(ledger, receipt))
        .collect()
}

/// One `invoice=amount` argument. An empty amount is kept as missing so the
/// ledger can drop the line.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationArg {
    pub invoice: String,
    pub amount: Option<Decimal>,
}

pub fn parse_allocation(value: &str) -> Result<AllocationArg> {
    let (invoice, amount) = value
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("Expected invoice=amount, got {:?}", value))?;
    let invoice = invoice.trim();
    if invoice.is_empty() {
        return Err(anyhow!("Missing invoice in {:?}", value));
    }
    let amount = match amount.trim() {
        "" => None,
        text => Some(parse_decimal(text)?),
    };
    Ok(AllocationArg {
        invoice: invoice.to_string(),
        amount,
    })
}

/// Builds a receipt draft, translating invoice numbers into ids. Keys that
/// match no invoice are passed through for the ledger to reject.
pub fn build_receipt_draft(
    ledger: &Ledger,
    client_id: String,
    date: NaiveDate,
    payment_method: String,
    allocations: Vec<AllocationArg>,
    notes: String,
) -> ReceiptDraft {
    let allocations = allocations
        .into_iter()
        .map(|arg| AllocationDraft {
            invoice_id: resolve_invoice(ledger, &arg.invoice)
                .map(|invoice| invoice.id.clone())
                .unwrap_or(arg.invoice),
            applied_amount: arg.amount,
        })
        .collect();
    ReceiptDraft {
        client_id,
        date,
        payment_method,
        allocations,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn allocations_parse_from_text() {
        assert_eq!(
            parse_allocation("00000003=1210,00").unwrap(),
            AllocationArg {
                invoice: "00000003".to_string(),
                amount: Some(dec!(1210.00)),
            }
        );
        assert_eq!(parse_allocation("7=").unwrap().amount, None);
        assert!(parse_allocation("=100").is_err());
        assert!(parse_allocation("7").is_err());
        assert!(parse_allocation("7=cien").is_err());
    }

    #[test]
    fn unknown_invoice_keys_pass_through() {
        let draft = build_receipt_draft(
            &Ledger::default(),
            "c-1".to_string(),
            NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            "Transferencia".to_string(),
            vec![AllocationArg {
                invoice: "99".to_string(),
                amount: Some(dec!(10)),
            }],
            String::new(),
        );
        assert_eq!(draft.allocations[0].invoice_id, "99");
    }
}
