pub mod invoicing;
pub mod merge;
pub mod reconcile;
pub mod remote;
pub mod state;
pub mod store;
