use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use civil_billing::models::{ClientDetail, ClientSummary, DashboardStats, InvoiceSummary, ReceiptSummary, Settings};
use civil_billing::utils::format_currency;

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn dashboard(stats: &DashboardStats) -> String {
    let mut summary = table(vec!["", ""]);
    summary.add_row(vec!["Clients".to_string(), stats.total_clients.to_string()]);
    summary.add_row(vec!["Open invoices".to_string(), stats.open_invoices.to_string()]);
    summary.add_row(vec!["Receivable".to_string(), format_currency(stats.receivable)]);
    summary.add_row(vec!["Collected".to_string(), format_currency(stats.collected)]);

    let mut out = format!("{}\n{}\n", stats.company_name, summary);
    if !stats.recent_invoices.is_empty() {
        out.push_str(&format!("\nRecent invoices\n{}\n", invoices(&stats.recent_invoices)));
    }
    if !stats.recent_receipts.is_empty() {
        out.push_str(&format!("\nRecent receipts\n{}\n", receipts(&stats.recent_receipts)));
    }
    out
}

pub fn clients(rows: &[ClientSummary]) -> String {
    let mut out = table(vec!["Id", "Name", "Contact", "Open", "Balance"]);
    for row in rows {
        out.add_row(vec![
            row.id.clone(),
            row.name.clone(),
            row.contact.clone().unwrap_or_default(),
            row.open_invoices.to_string(),
            format_currency(row.balance),
        ]);
    }
    out.to_string()
}

pub fn client_detail(detail: &ClientDetail) -> String {
    let client = &detail.client;
    let mut card = table(vec!["", ""]);
    let fields = [
        ("Id", Some(client.id.as_str())),
        ("Name", Some(client.name.as_str())),
        ("Tax id", client.tax_id.as_deref()),
        ("Email", client.email.as_deref()),
        ("Phone", client.phone.as_deref()),
        ("Address", client.address.as_deref()),
    ];
    for (label, value) in fields {
        card.add_row(vec![label.to_string(), value.unwrap_or("-").to_string()]);
    }
    card.add_row(vec!["Balance".to_string(), format_currency(detail.balance)]);

    let mut out = format!("{}\n", card);
    if !detail.invoices.is_empty() {
        out.push_str(&format!("\nInvoices\n{}\n", invoices(&detail.invoices)));
    }
    if !detail.receipts.is_empty() {
        out.push_str(&format!("\nReceipts\n{}\n", receipts(&detail.receipts)));
    }
    out
}

pub fn invoices(rows: &[InvoiceSummary]) -> String {
    let mut out = table(vec!["Number", "Date", "Client", "Description", "Total", "Balance", "Status"]);
    for row in rows {
        out.add_row(vec![
            row.number.clone(),
            row.date.format("%d/%m/%Y").to_string(),
            row.client_name.clone().unwrap_or_default(),
            row.description.clone(),
            format_currency(row.total),
            format_currency(row.balance),
            row.status.as_str().to_string(),
        ]);
    }
    out.to_string()
}

pub fn receipts(rows: &[ReceiptSummary]) -> String {
    let mut out = table(vec!["Number", "Date", "Client", "Method", "Amount"]);
    for row in rows {
        out.add_row(vec![
            row.number.clone(),
            row.date.format("%d/%m/%Y").to_string(),
            row.client_name.clone().unwrap_or_default(),
            row.payment_method.clone(),
            format_currency(row.amount),
        ]);
    }
    out.to_string()
}

pub fn settings(settings: &Settings) -> String {
    let mut out = table(vec!["Setting", "Value"]);
    out.add_row(vec![
        "api_base".to_string(),
        settings.api_base.clone().unwrap_or_else(|| "(not set)".to_string()),
    ]);
    let token = match settings.api_token.as_deref() {
        Some(token) if !token.is_empty() => "(set)",
        _ => "(not set)",
    };
    out.add_row(vec!["api_token".to_string(), token.to_string()]);
    out.to_string()
}
