use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Client {
    /// Email if non-empty, phone otherwise. This is what the record service
    /// stores as the client's single contact cell. A whitespace-only email
    /// still counts as present.
    pub fn contact(&self) -> Option<&str> {
        self.email
            .as_deref()
            .filter(|value| !value.is_empty())
            .or_else(|| self.phone.as_deref().filter(|value| !value.is_empty()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Pending,
    Partial,
    Paid,
}

impl InvoiceStatus {
    pub fn for_balance(balance: Decimal, total: Decimal) -> Self {
        if balance.is_zero() {
            InvoiceStatus::Paid
        } else if balance < total {
            InvoiceStatus::Partial
        } else {
            InvoiceStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Partial => "Partial",
            InvoiceStatus::Paid => "Paid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl LineItem {
    /// `None` when quantity times unit price does not fit a `Decimal`.
    pub fn amount(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_price)
    }
}

/// An issued invoice.
///
/// `balance` and `status` are private: they start at `total`/`Pending` and
/// move only through [`Invoice::apply_payment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub number: String,
    pub client_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub tax_rate: Decimal,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    balance: Decimal,
    status: InvoiceStatus,
}

impl Invoice {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn issue(
        id: String,
        number: String,
        client_id: String,
        date: NaiveDate,
        description: String,
        line_items: Vec<LineItem>,
        tax_rate: Decimal,
        subtotal: Decimal,
        tax: Decimal,
        total: Decimal,
    ) -> Self {
        Invoice {
            id,
            number,
            client_id,
            date,
            description,
            line_items,
            tax_rate,
            subtotal,
            tax,
            total,
            balance: total,
            status: InvoiceStatus::Pending,
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.balance > Decimal::ZERO
    }

    /// Returns a copy of this invoice with `amount` applied against its
    /// balance. The balance never drops below zero.
    pub(crate) fn apply_payment(&self, amount: Decimal) -> Invoice {
        let balance = (self.balance - amount).max(Decimal::ZERO);
        Invoice {
            balance,
            status: InvoiceStatus::for_balance(balance, self.total),
            ..self.clone()
        }
    }

    /// Clamps the balance into `[0, total]` and recomputes the status.
    /// Returns whether anything changed.
    pub(crate) fn normalize(&mut self) -> bool {
        let balance = self.balance.clamp(Decimal::ZERO, self.total.max(Decimal::ZERO));
        let status = InvoiceStatus::for_balance(balance, self.total);
        let changed = balance != self.balance || status != self.status;
        self.balance = balance;
        self.status = status;
        changed
    }
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub client_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub line_items: Vec<LineItem>,
    pub tax_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub invoice_id: String,
    pub applied_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: String,
    pub number: String,
    pub client_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub payment_method: String,
    pub amount: Decimal,
    pub allocations: Vec<Allocation>,
    #[serde(default)]
    pub notes: String,
}

/// A caller-side allocation line. Lines with a missing or non-positive
/// amount are ignored.
#[derive(Debug, Clone)]
pub struct AllocationDraft {
    pub invoice_id: String,
    pub applied_amount: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct ReceiptDraft {
    pub client_id: String,
    pub date: NaiveDate,
    pub payment_method: String,
    pub allocations: Vec<AllocationDraft>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub name: String,
    pub tax_id: String,
    pub address: String,
}

impl Default for Company {
    fn default() -> Self {
        Company {
            name: "Servicios de Ingeniería Civil S.R.L.".to_string(),
            tax_id: "30-12345678-9".to_string(),
            address: "Bv. Mitre 123, Córdoba".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceCounters {
    pub invoice: u64,
    pub receipt: u64,
}

impl Default for SequenceCounters {
    fn default() -> Self {
        SequenceCounters { invoice: 1, receipt: 1 }
    }
}

impl SequenceCounters {
    pub fn invoice_number(&self) -> String {
        format!("{:08}", self.invoice)
    }

    pub fn receipt_number(&self) -> String {
        format!("RC-{:06}", self.receipt)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ledger {
    pub company: Company,
    pub sequence_counters: SequenceCounters,
    pub clients: Vec<Client>,
    pub invoices: Vec<Invoice>,
    pub receipts: Vec<Receipt>,
}

impl Ledger {
    pub fn client(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|client| client.id == id)
    }

    pub fn invoice(&self, id: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|invoice| invoice.id == id)
    }

    pub fn invoice_by_number(&self, number: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|invoice| invoice.number == number)
    }

    pub fn invoices_for<'a>(&'a self, client_id: &'a str) -> impl Iterator<Item = &'a Invoice> + 'a {
        self.invoices
            .iter()
            .filter(move |invoice| invoice.client_id == client_id)
    }

    pub fn receipts_for<'a>(&'a self, client_id: &'a str) -> impl Iterator<Item = &'a Receipt> + 'a {
        self.receipts
            .iter()
            .filter(move |receipt| receipt.client_id == client_id)
    }

    /// Sum of the open balances of one client's invoices.
    pub fn client_balance(&self, client_id: &str) -> Decimal {
        saturating_sum(self.invoices_for(client_id).map(Invoice::balance))
    }

    pub fn receivable(&self) -> Decimal {
        saturating_sum(self.invoices.iter().map(Invoice::balance))
    }

    pub fn collected(&self) -> Decimal {
        saturating_sum(self.receipts.iter().map(|receipt| receipt.amount))
    }

    /// Restores the balance/status invariant on every invoice and raises the
    /// sequence counters past every number already issued. Returns the number
    /// of corrections made.
    pub fn normalize(&mut self) -> usize {
        let mut corrected = self
            .invoices
            .iter_mut()
            .map(Invoice::normalize)
            .filter(|changed| *changed)
            .count();

        let next_invoice = self
            .invoices
            .iter()
            .filter_map(|invoice| invoice.number.parse::<u64>().ok())
            .max()
            .map(|issued| issued.saturating_add(1));
        if let Some(next) = next_invoice.filter(|next| *next > self.sequence_counters.invoice) {
            self.sequence_counters.invoice = next;
            corrected += 1;
        }

        let next_receipt = self
            .receipts
            .iter()
            .filter_map(|receipt| receipt.number.strip_prefix("RC-")?.parse::<u64>().ok())
            .max()
            .map(|issued| issued.saturating_add(1));
        if let Some(next) = next_receipt.filter(|next| *next > self.sequence_counters.receipt) {
            self.sequence_counters.receipt = next;
            corrected += 1;
        }

        corrected
    }
}

/// Display totals clamp at `Decimal::MAX` instead of panicking.
fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub api_base: Option<String>,
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    pub id: String,
    pub name: String,
    pub contact: Option<String>,
    pub open_invoices: usize,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSummary {
    pub id: String,
    pub number: String,
    pub date: NaiveDate,
    pub client_name: Option<String>,
    pub description: String,
    pub total: Decimal,
    pub balance: Decimal,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptSummary {
    pub id: String,
    pub number: String,
    pub date: NaiveDate,
    pub client_name: Option<String>,
    pub payment_method: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientDetail {
    pub client: Client,
    pub balance: Decimal,
    pub invoices: Vec<InvoiceSummary>,
    pub receipts: Vec<ReceiptSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub company_name: String,
    pub total_clients: usize,
    pub open_invoices: usize,
    pub receivable: Decimal,
    pub collected: Decimal,
    pub recent_invoices: Vec<InvoiceSummary>,
    pub recent_receipts: Vec<ReceiptSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn invoice(total: Decimal) -> Invoice {
        Invoice::issue(
            "inv-1".to_string(),
            "00000001".to_string(),
            "c-1".to_string(),
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            "Estudio de suelos".to_string(),
            Vec::new(),
            dec!(0),
            total,
            dec!(0),
            total,
        )
    }

    #[test]
    fn status_follows_balance() {
        assert_eq!(InvoiceStatus::for_balance(dec!(0), dec!(100)), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::for_balance(dec!(40), dec!(100)), InvoiceStatus::Partial);
        assert_eq!(InvoiceStatus::for_balance(dec!(100), dec!(100)), InvoiceStatus::Pending);
    }

    #[test]
    fn payment_never_drives_balance_negative() {
        let paid = invoice(dec!(100)).apply_payment(dec!(130));
        assert_eq!(paid.balance(), dec!(0));
        assert_eq!(paid.status(), InvoiceStatus::Paid);
    }

    #[test]
    fn normalize_repairs_a_hand_edited_snapshot() {
        let raw = r#"{
            "invoices": [{
                "id": "inv-1", "number": "00000001", "clientId": "c-1",
                "date": "2024-05-02", "taxRate": "0", "subtotal": "100",
                "tax": "0", "total": "100", "balance": "250", "status": "Paid"
            }]
        }"#;
        let mut ledger: Ledger = serde_json::from_str(raw).unwrap();
        assert_eq!(ledger.normalize(), 2);
        let invoice = &ledger.invoices[0];
        assert_eq!(invoice.balance(), dec!(100));
        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert_eq!(ledger.sequence_counters, SequenceCounters { invoice: 2, receipt: 1 });
        assert_eq!(ledger.company, Company::default());
    }

    #[test]
    fn counters_are_raised_past_issued_numbers() {
        let raw = r#"{
            "sequenceCounters": {"invoice": 3, "receipt": 1},
            "invoices": [{
                "id": "inv-7", "number": "00000007", "clientId": "c-1",
                "date": "2024-05-02", "taxRate": "0", "subtotal": "100",
                "tax": "0", "total": "100", "balance": "100", "status": "Pending"
            }],
            "receipts": [{
                "id": "rc-4", "number": "RC-000004", "clientId": "c-1",
                "date": "2024-05-03", "amount": "0", "allocations": []
            }]
        }"#;
        let mut ledger: Ledger = serde_json::from_str(raw).unwrap();
        assert_eq!(ledger.normalize(), 2);
        assert_eq!(ledger.sequence_counters.invoice_number(), "00000008");
        assert_eq!(ledger.sequence_counters.receipt_number(), "RC-000005");

        // Counters already ahead of the issued numbers are left alone.
        ledger.sequence_counters = SequenceCounters { invoice: 20, receipt: 9 };
        assert_eq!(ledger.normalize(), 0);
        assert_eq!(ledger.sequence_counters, SequenceCounters { invoice: 20, receipt: 9 });
    }

    #[test]
    fn line_amount_reports_overflow() {
        let item = LineItem {
            description: String::new(),
            quantity: dec!(2),
            unit_price: Decimal::MAX,
        };
        assert_eq!(item.amount(), None);
    }

    #[test]
    fn ledger_totals_saturate() {
        let mut ledger = Ledger::default();
        let mut big = invoice(Decimal::MAX);
        ledger.invoices.push(big.clone());
        big.id = "inv-2".to_string();
        ledger.invoices.push(big);
        assert_eq!(ledger.receivable(), Decimal::MAX);
        assert_eq!(ledger.client_balance("c-1"), Decimal::MAX);
    }

    #[test]
    fn document_numbers_are_zero_padded() {
        let counters = SequenceCounters { invoice: 42, receipt: 7 };
        assert_eq!(counters.invoice_number(), "00000042");
        assert_eq!(counters.receipt_number(), "RC-000007");
    }

    #[test]
    fn contact_falls_back_to_phone() {
        let client = Client {
            id: "c-1".to_string(),
            name: "Acme".to_string(),
            tax_id: None,
            email: Some(String::new()),
            phone: Some("351-555".to_string()),
            address: None,
        };
        assert_eq!(client.contact(), Some("351-555"));
    }

    #[test]
    fn blank_but_present_email_is_kept_as_contact() {
        let client = Client {
            id: "c-1".to_string(),
            name: "Acme".to_string(),
            tax_id: None,
            email: Some("  ".to_string()),
            phone: Some("351-555".to_string()),
            address: None,
        };
        assert_eq!(client.contact(), Some("  "));
    }
}
