use serde_json::Value;
use tracing::{info, warn};

use crate::error::{BillingError, Operation, RemoteError, ValidationError};
use crate::models::{Client, Invoice, Ledger, NewClient, NewInvoice, Receipt, ReceiptDraft};
use crate::services::invoicing::{build_invoice, commit_invoice};
use crate::services::merge::merge_clients;
use crate::services::reconcile::{apply_receipt, commit_receipt};
use crate::services::remote::{self, RecordKind, RecordService};
use crate::services::store::{load_snapshot, save_snapshot, BlobStore};

/// Outcome of copying a committed record to the record service.
#[derive(Debug)]
pub enum MirrorStatus {
    Mirrored,
    /// No record service is configured.
    Disabled,
    Failed(BillingError),
}

impl MirrorStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, MirrorStatus::Failed(_))
    }
}

/// A record that is committed locally, whatever happened remotely.
#[derive(Debug)]
pub struct Committed<T> {
    pub record: T,
    pub mirror: MirrorStatus,
}

/// Owns the ledger and its collaborators. Every mutation validates first,
/// commits in memory, persists the snapshot and only then talks to the
/// record service.
pub struct Billing<R> {
    ledger: Ledger,
    store: Box<dyn BlobStore>,
    remote: Option<R>,
}

impl<R: RecordService> Billing<R> {
    pub fn open(store: Box<dyn BlobStore>, remote: Option<R>) -> Self {
        let ledger = load_snapshot(store.as_ref());
        info!(
            clients = ledger.clients.len(),
            invoices = ledger.invoices.len(),
            receipts = ledger.receipts.len(),
            "Ledger loaded"
        );
        Billing {
            ledger,
            store,
            remote,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    fn persist(&self) {
        save_snapshot(self.store.as_ref(), &self.ledger);
    }

    fn client_name(&self, client_id: &str) -> String {
        self.ledger
            .client(client_id)
            .map(|client| client.name.clone())
            .unwrap_or_default()
    }

    async fn mirror(&self, operation: Operation, kind: RecordKind, row: Result<Value, RemoteError>) -> MirrorStatus {
        let Some(remote) = &self.remote else {
            return MirrorStatus::Disabled;
        };
        let result = match row {
            Ok(row) => remote.create(kind, row).await.map(|_| ()),
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => MirrorStatus::Mirrored,
            Err(err) => {
                warn!(%operation, error = %err, "Remote mirror failed; keeping local record");
                MirrorStatus::Failed(BillingError::remote(operation, err))
            }
        }
    }

    pub async fn create_client(&mut self, draft: NewClient) -> Result<Committed<Client>, BillingError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(BillingError::validation(Operation::CreateClient, ValidationError::EmptyName));
        }
        let clean = |value: Option<String>| {
            value
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let client = Client {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            tax_id: clean(draft.tax_id),
            email: clean(draft.email),
            phone: clean(draft.phone),
            address: clean(draft.address),
        };

        self.ledger.clients.push(client.clone());
        self.persist();
        info!(client_id = %client.id, name = %client.name, "Client created");

        let mirror = self
            .mirror(Operation::CreateClient, RecordKind::Client, remote::client_row(&client))
            .await;
        Ok(Committed { record: client, mirror })
    }

    /// Removes a client that owns no invoices or receipts. Local only.
    pub fn delete_client(&mut self, client_id: &str) -> Result<Client, BillingError> {
        let reject = |err| BillingError::validation(Operation::DeleteClient, err);
        let position = self
            .ledger
            .clients
            .iter()
            .position(|client| client.id == client_id)
            .ok_or_else(|| reject(ValidationError::UnknownClient(client_id.to_string())))?;
        let in_use = self.ledger.invoices_for(client_id).next().is_some()
            || self.ledger.receipts_for(client_id).next().is_some();
        if in_use {
            return Err(reject(ValidationError::ClientInUse(client_id.to_string())));
        }

        let client = self.ledger.clients.remove(position);
        self.persist();
        info!(client_id = %client.id, "Client deleted");
        Ok(client)
    }

    pub async fn create_invoice(&mut self, draft: NewInvoice) -> Result<Committed<Invoice>, BillingError> {
        let invoice = build_invoice(&self.ledger, draft)
            .map_err(|err| BillingError::validation(Operation::CreateInvoice, err))?;

        commit_invoice(&mut self.ledger, invoice.clone());
        self.persist();
        info!(number = %invoice.number, total = %invoice.total, "Invoice created");

        let row = remote::invoice_row(&invoice, &self.client_name(&invoice.client_id));
        let mirror = self
            .mirror(Operation::CreateInvoice, RecordKind::Invoice, row)
            .await;
        Ok(Committed { record: invoice, mirror })
    }

    pub async fn register_receipt(&mut self, draft: ReceiptDraft) -> Result<Committed<Receipt>, BillingError> {
        let reconciled = apply_receipt(&self.ledger, draft)
            .map_err(|err| BillingError::validation(Operation::RegisterReceipt, err))?;

        let receipt = commit_receipt(&mut self.ledger, reconciled);
        self.persist();
        info!(
            number = %receipt.number,
            amount = %receipt.amount,
            invoices = receipt.allocations.len(),
            "Receipt registered"
        );

        let row = remote::receipt_row(&receipt, &self.client_name(&receipt.client_id));
        let mirror = self
            .mirror(Operation::RegisterReceipt, RecordKind::Receipt, row)
            .await;
        Ok(Committed { record: receipt, mirror })
    }

    /// Pulls the remote client list and merges it in. Returns how many
    /// clients were added; without a record service this is a no-op.
    pub async fn sync_clients(&mut self) -> Result<usize, BillingError> {
        let Some(remote) = &self.remote else {
            return Ok(0);
        };
        let rows = remote
            .list(RecordKind::Client)
            .await
            .map_err(|err| BillingError::remote(Operation::SyncClients, err))?;

        let incoming = remote::clients_from_rows(rows);
        let before = self.ledger.clients.len();
        self.ledger.clients = merge_clients(&self.ledger.clients, incoming);
        let added = self.ledger.clients.len() - before;
        if added > 0 {
            self.persist();
        }
        info!(added, "Clients synced");
        Ok(added)
    }
}
