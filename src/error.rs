use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

/// The ledger operation an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateClient,
    DeleteClient,
    CreateInvoice,
    RegisterReceipt,
    SyncClients,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::CreateClient => "create client",
            Operation::DeleteClient => "delete client",
            Operation::CreateInvoice => "create invoice",
            Operation::RegisterReceipt => "register receipt",
            Operation::SyncClients => "sync clients",
        };
        f.write_str(name)
    }
}

/// Input rejected before anything was mutated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("client name is empty")]
    EmptyName,

    #[error("unknown client {0}")]
    UnknownClient(String),

    #[error("client {0} still has invoices or receipts")]
    ClientInUse(String),

    #[error("invoice has no billable line items")]
    EmptyLineItems,

    #[error("line item {0} has a negative quantity or unit price")]
    NegativeLineItem(usize),

    #[error("tax rate {0} is negative")]
    NegativeTaxRate(Decimal),

    #[error("amount is too large to compute")]
    AmountOverflow,

    #[error("nothing to apply")]
    NothingToApply,

    #[error("unknown invoice {0}")]
    UnknownInvoice(String),

    #[error("invoice {invoice} does not belong to client {client}")]
    ForeignInvoice { invoice: String, client: String },

    #[error("cannot apply {applied} to invoice {invoice}: open balance is {balance}")]
    ExceedsBalance {
        invoice: String,
        applied: Decimal,
        balance: Decimal,
    },
}

/// Local blob store failure. Never shown to the user.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Failure talking to the remote record service.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("service rejected the request: {0}")]
    Rejected(String),

    #[error("unexpected response: {0}")]
    UnexpectedShape(String),
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("{operation}: {source}")]
    Validation {
        operation: Operation,
        #[source]
        source: ValidationError,
    },

    #[error("{operation}: {source}")]
    Remote {
        operation: Operation,
        #[source]
        source: RemoteError,
    },
}

impl BillingError {
    pub fn validation(operation: Operation, source: ValidationError) -> Self {
        BillingError::Validation { operation, source }
    }

    pub fn remote(operation: Operation, source: RemoteError) -> Self {
        BillingError::Remote { operation, source }
    }

    pub fn operation(&self) -> Operation {
        match self {
            BillingError::Validation { operation, .. } | BillingError::Remote { operation, .. } => *operation,
        }
    }
}
