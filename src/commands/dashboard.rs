use crate::commands::invoices::invoice_summary;
use crate::commands::receipts::receipt_summary;
use crate::models::DashboardStats;
use crate::services::remote::RecordService;
use crate::services::state::Billing;

pub fn get_dashboard_stats<R: RecordService>(billing: &Billing<R>, recent: usize) -> DashboardStats {
    let ledger = billing.ledger();

    let recent_invoices = ledger
        .invoices
        .iter()
        .rev()
        .take(recent)
        .map(|invoice| invoice_summary(ledger, invoice))
        .collect();
    let recent_receipts = ledger
        .receipts
        .iter()
        .rev()
        .take(recent)
        .map(|receipt| receipt_summary(ledger, receipt))
        .collect();

    DashboardStats {
        company_name: ledger.company.name.clone(),
        total_clients: ledger.clients.len(),
        open_invoices: ledger.invoices.iter().filter(|invoice| invoice.is_open()).count(),
        receivable: ledger.receivable(),
        collected: ledger.collected(),
        recent_invoices,
        recent_receipts,
    }
}
