//! Client for the spreadsheet-backed record service.
//!
//! The service speaks a small JSON protocol: lists are fetched with
//! `GET ?type=<sheet>&token=<token>`, records are created by POSTing
//! `{"op", "token", "data"}` as `text/plain`, and every answer is an
//! envelope `{ ok, data?, error? }`. Row shapes use the sheet's column
//! names and are mapped to the ledger model here and nowhere else.

use reqwest::header::CONTENT_TYPE;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::models::{Client, Invoice, Receipt, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Client,
    Invoice,
    Receipt,
}

impl RecordKind {
    fn sheet(&self) -> &'static str {
        match self {
            RecordKind::Client => "clientes",
            RecordKind::Invoice => "facturas",
            RecordKind::Receipt => "recibos",
        }
    }

    fn create_op(&self) -> &'static str {
        match self {
            RecordKind::Client => "crear_cliente",
            RecordKind::Invoice => "crear_factura",
            RecordKind::Receipt => "registrar_cobro",
        }
    }
}

/// Request/response access to remote records. Calls are never retried.
#[allow(async_fn_in_trait)]
pub trait RecordService {
    async fn create(&self, kind: RecordKind, record: Value) -> Result<Option<Value>, RemoteError>;
    async fn list(&self, kind: RecordKind) -> Result<Vec<Value>, RemoteError>;
}

pub struct HttpRecordService {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpRecordService {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        HttpRecordService {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// `None` when no endpoint is configured.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let base = settings.api_base.as_deref().map(str::trim).unwrap_or_default();
        if base.is_empty() {
            return None;
        }
        Some(Self::new(base, settings.api_token.clone().unwrap_or_default()))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Option<Value>, RemoteError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_envelope(status, &body)
    }
}

impl RecordService for HttpRecordService {
    async fn create(&self, kind: RecordKind, record: Value) -> Result<Option<Value>, RemoteError> {
        debug!(op = kind.create_op(), "Creating remote record");
        let payload = json!({
            "op": kind.create_op(),
            "token": self.token,
            "data": record,
        });
        // text/plain keeps the script endpoint from requiring a CORS preflight
        let request = self
            .client
            .post(&self.base_url)
            .header(CONTENT_TYPE, "text/plain")
            .body(payload.to_string());
        self.send(request).await
    }

    async fn list(&self, kind: RecordKind) -> Result<Vec<Value>, RemoteError> {
        debug!(sheet = kind.sheet(), "Listing remote records");
        let request = self
            .client
            .get(&self.base_url)
            .query(&[("type", kind.sheet()), ("token", self.token.as_str())]);
        match self.send(request).await? {
            Some(Value::Array(rows)) => Ok(rows),
            Some(_) | None => Err(RemoteError::UnexpectedShape(format!(
                "{} list did not contain an array of rows",
                kind.sheet()
            ))),
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

fn snippet(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((end, _)) => format!("{}…", &trimmed[..end]),
        None => trimmed.to_string(),
    }
}

/// Interprets a raw service response. A body that is not a JSON envelope
/// usually means the endpoint answered with a login or redirect page.
pub fn parse_envelope(status: u16, body: &str) -> Result<Option<Value>, RemoteError> {
    if !(200..300).contains(&status) {
        return Err(RemoteError::Status {
            status,
            body: snippet(body),
        });
    }
    let envelope: Envelope = serde_json::from_str(body).map_err(|_| {
        RemoteError::UnexpectedShape(format!(
            "expected a JSON envelope, check the endpoint URL and its access permissions (got: {})",
            snippet(body)
        ))
    })?;
    if !envelope.ok {
        let message = match envelope.error {
            Some(Value::String(message)) if !message.trim().is_empty() => message,
            Some(Value::Null) | None => "unknown error".to_string(),
            Some(other) => other.to_string(),
        };
        return Err(RemoteError::Rejected(message));
    }
    Ok(envelope.data)
}

/// Accepts strings, numbers and booleans; anything else becomes "".
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ClientRow {
    #[serde(rename = "ID", default, deserialize_with = "lenient_string")]
    id: String,
    #[serde(rename = "Nombre", default, deserialize_with = "lenient_string")]
    name: String,
    #[serde(rename = "CUIT", default, deserialize_with = "lenient_string")]
    tax_id: String,
    #[serde(rename = "Contacto", default, deserialize_with = "lenient_string")]
    contact: String,
    #[serde(rename = "Telefono", default, deserialize_with = "lenient_string")]
    phone: String,
    #[serde(rename = "Empresa", default, deserialize_with = "lenient_string")]
    address: String,
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Maps one sheet row to a client. Missing cells default to empty, empty
/// cells become `None`, and a row without an `ID` gets a fresh one.
pub fn client_from_row(row: Value) -> Result<Client, RemoteError> {
    let row: ClientRow = serde_json::from_value(row)
        .map_err(|err| RemoteError::UnexpectedShape(format!("client row: {}", err)))?;
    let id = if row.id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        row.id
    };
    Ok(Client {
        id,
        name: row.name,
        tax_id: non_empty(row.tax_id),
        email: non_empty(row.contact),
        phone: non_empty(row.phone),
        address: non_empty(row.address),
    })
}

/// Maps a listed page of rows, skipping rows that are malformed or blank.
pub fn clients_from_rows(rows: Vec<Value>) -> Vec<Client> {
    rows.into_iter()
        .filter_map(|row| match client_from_row(row) {
            Ok(client) if !client.name.is_empty() => Some(client),
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "Skipping remote client row");
                None
            }
        })
        .collect()
}

#[derive(Serialize)]
struct NewClientRow<'a> {
    #[serde(rename = "Nombre")]
    name: &'a str,
    #[serde(rename = "Empresa")]
    address: &'a str,
    #[serde(rename = "Contacto")]
    contact: &'a str,
}

#[derive(Serialize)]
struct InvoiceRow<'a> {
    #[serde(rename = "Fecha")]
    date: String,
    #[serde(rename = "Nombre")]
    client_name: &'a str,
    #[serde(rename = "Numero")]
    number: &'a str,
    #[serde(rename = "Subtotal", with = "rust_decimal::serde::float")]
    subtotal: Decimal,
    #[serde(rename = "Total", with = "rust_decimal::serde::float")]
    total: Decimal,
    #[serde(rename = "Concepto")]
    description: &'a str,
    #[serde(rename = "ClienteID")]
    client_id: &'a str,
}

#[derive(Serialize)]
struct ReceiptItemRow<'a> {
    #[serde(rename = "facturaId")]
    invoice_id: &'a str,
    #[serde(rename = "aplicado", with = "rust_decimal::serde::float")]
    applied: Decimal,
}

#[derive(Serialize)]
struct ReceiptRow<'a> {
    #[serde(rename = "Numero")]
    number: &'a str,
    #[serde(rename = "Fecha")]
    date: String,
    #[serde(rename = "Nombre")]
    client_name: &'a str,
    #[serde(rename = "Monto", with = "rust_decimal::serde::float")]
    amount: Decimal,
    #[serde(rename = "Medio")]
    payment_method: &'a str,
    items: Vec<ReceiptItemRow<'a>>,
    #[serde(rename = "Observaciones")]
    notes: &'a str,
}

fn encode<T: Serialize>(row: &T) -> Result<Value, RemoteError> {
    serde_json::to_value(row).map_err(|err| RemoteError::UnexpectedShape(format!("could not encode record: {}", err)))
}

pub fn client_row(client: &Client) -> Result<Value, RemoteError> {
    encode(&NewClientRow {
        name: &client.name,
        address: client.address.as_deref().unwrap_or_default(),
        contact: client.contact().unwrap_or_default(),
    })
}

pub fn invoice_row(invoice: &Invoice, client_name: &str) -> Result<Value, RemoteError> {
    encode(&InvoiceRow {
        date: invoice.date.format("%Y-%m-%d").to_string(),
        client_name,
        number: &invoice.number,
        subtotal: invoice.subtotal,
        total: invoice.total,
        description: &invoice.description,
        client_id: &invoice.client_id,
    })
}

pub fn receipt_row(receipt: &Receipt, client_name: &str) -> Result<Value, RemoteError> {
    encode(&ReceiptRow {
        number: &receipt.number,
        date: receipt.date.format("%Y-%m-%d").to_string(),
        client_name,
        amount: receipt.amount,
        payment_method: &receipt.payment_method,
        items: receipt
            .allocations
            .iter()
            .map(|allocation| ReceiptItemRow {
                invoice_id: &allocation.invoice_id,
                applied: allocation.applied_amount,
            })
            .collect(),
        notes: &receipt.notes,
    })
}
