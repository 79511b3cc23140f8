use crate::commands::invoices::invoice_summary;
use crate::commands::receipts::receipt_summary;
use crate::models::{Client, ClientDetail, ClientSummary, Ledger};

pub fn get_clients(ledger: &Ledger) -> Vec<ClientSummary> {
    ledger
        .clients
        .iter()
        .map(|client| ClientSummary {
            id: client.id.clone(),
            name: client.name.clone(),
            contact: client.contact().map(str::to_string),
            open_invoices: ledger.invoices_for(&client.id).filter(|invoice| invoice.is_open()).count(),
            balance: ledger.client_balance(&client.id),
        })
        .collect()
}

/// Finds a client by id, or by name when exactly one client carries it.
pub fn resolve_client<'a>(ledger: &'a Ledger, key: &str) -> Option<&'a Client> {
    let key = key.trim();
    if let Some(client) = ledger.client(key) {
        return Some(client);
    }
    let mut by_name = ledger
        .clients
        .iter()
        .filter(|client| client.name.trim().eq_ignore_ascii_case(key));
    match (by_name.next(), by_name.next()) {
        (Some(client), None) => Some(client),
        _ => None,
    }
}

pub fn get_client_detail(ledger: &Ledger, key: &str) -> Option<ClientDetail> {
    let client = resolve_client(ledger, key)?;
    Some(ClientDetail {
        client: client.clone(),
        balance: ledger.client_balance(&client.id),
        invoices: ledger
            .invoices_for(&client.id)
            .map(|invoice| invoice_summary(ledger, invoice))
            .collect(),
        receipts: ledger
            .receipts_for(&client.id)
            .map(|receipt| receipt_summary(ledger, receipt))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: &str, name: &str) -> Client {
        Client {
            id: id.to_string(),
            name: name.to_string(),
            tax_id: None,
            email: None,
            phone: None,
            address: None,
        }
    }

    #[test]
    fn clients_resolve_by_unique_name() {
        let mut ledger = Ledger::default();
        ledger.clients.push(client("c-1", "Acme"));
        ledger.clients.push(client("c-2", "Beta"));
        ledger.clients.push(client("c-3", "beta"));

        assert_eq!(resolve_client(&ledger, "c-2").unwrap().name, "Beta");
        assert_eq!(resolve_client(&ledger, "ACME").unwrap().id, "c-1");
        assert!(resolve_client(&ledger, "beta").is_none());
        assert!(get_client_detail(&ledger, "nobody").is_none());
    }

    #[test]
    fn summaries_start_with_zero_balance() {
        let mut ledger = Ledger::default();
        ledger.clients.push(client("c-1", "Acme"));
        let summaries = get_clients(&ledger);
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].balance.is_zero());
        assert_eq!(summaries[0].open_invoices, 0);
    }
}
