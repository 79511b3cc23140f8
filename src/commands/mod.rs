pub mod clients;
pub mod dashboard;
pub mod invoices;
pub mod receipts;
pub mod settings;
