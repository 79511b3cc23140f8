//! Receipt application.
//!
//! [`apply_receipt`] validates a payment and works out every invoice it
//! touches without mutating the ledger. [`commit_receipt`] then swaps the
//! updated invoices in, stores the receipt and advances the receipt counter
//! in one step, so a rejected receipt leaves no trace.

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::models::{Allocation, AllocationDraft, Invoice, Ledger, Receipt, ReceiptDraft};

#[derive(Debug, Clone)]
pub struct Reconciled {
    /// The referenced invoices with their new balances, in allocation order.
    pub invoices: Vec<Invoice>,
    pub receipt: Receipt,
}

/// Drops lines without a positive amount and folds repeated invoices into a
/// single allocation, keeping first-seen order.
fn collect_allocations(drafts: Vec<AllocationDraft>) -> Result<Vec<Allocation>, ValidationError> {
    let mut allocations: Vec<Allocation> = Vec::new();
    for draft in drafts {
        let amount = match draft.applied_amount {
            Some(amount) if amount > Decimal::ZERO => amount,
            _ => continue,
        };
        match allocations
            .iter_mut()
            .find(|allocation| allocation.invoice_id == draft.invoice_id)
        {
            Some(existing) => {
                existing.applied_amount = existing
                    .applied_amount
                    .checked_add(amount)
                    .ok_or(ValidationError::AmountOverflow)?;
            }
            None => allocations.push(Allocation {
                invoice_id: draft.invoice_id,
                applied_amount: amount,
            }),
        }
    }
    Ok(allocations)
}

pub fn apply_receipt(ledger: &Ledger, draft: ReceiptDraft) -> Result<Reconciled, ValidationError> {
    let allocations = collect_allocations(draft.allocations)?;
    if allocations.is_empty() {
        return Err(ValidationError::NothingToApply);
    }
    if ledger.client(&draft.client_id).is_none() {
        return Err(ValidationError::UnknownClient(draft.client_id));
    }

    let mut invoices = Vec::with_capacity(allocations.len());
    for allocation in &allocations {
        let invoice = ledger
            .invoice(&allocation.invoice_id)
            .ok_or_else(|| ValidationError::UnknownInvoice(allocation.invoice_id.clone()))?;
        if invoice.client_id != draft.client_id {
            return Err(ValidationError::ForeignInvoice {
                invoice: invoice.number.clone(),
                client: draft.client_id.clone(),
            });
        }
        if allocation.applied_amount > invoice.balance() {
            return Err(ValidationError::ExceedsBalance {
                invoice: invoice.number.clone(),
                applied: allocation.applied_amount,
                balance: invoice.balance(),
            });
        }
        invoices.push(invoice.apply_payment(allocation.applied_amount));
    }

    let amount = allocations
        .iter()
        .try_fold(Decimal::ZERO, |sum, allocation| sum.checked_add(allocation.applied_amount))
        .ok_or(ValidationError::AmountOverflow)?;
    let receipt = Receipt {
        id: uuid::Uuid::new_v4().to_string(),
        number: ledger.sequence_counters.receipt_number(),
        client_id: draft.client_id,
        date: draft.date,
        payment_method: draft.payment_method.trim().to_string(),
        amount,
        allocations,
        notes: draft.notes.trim().to_string(),
    };

    Ok(Reconciled { invoices, receipt })
}

pub fn commit_receipt(ledger: &mut Ledger, reconciled: Reconciled) -> Receipt {
    for updated in reconciled.invoices {
        if let Some(slot) = ledger
            .invoices
            .iter_mut()
            .find(|invoice| invoice.id == updated.id)
        {
            *slot = updated;
        }
    }
    ledger.sequence_counters.receipt += 1;
    ledger.receipts.push(reconciled.receipt.clone());
    reconciled.receipt
}
