//! Store connectivity module for the expense-note app.
//!
//! The store is the external service holding bills and their receipt files.
//! It is abstracted behind the [`BillStore`] trait so the web layer does not
//! depend on a concrete backend; a seeded in-memory implementation lives in
//! the `memory` submodule and a mock is generated for tests.

use async_trait::async_trait;
use mockall::automock;

use crate::bill::Bill;

pub mod memory;

/// Errors reported by the store.
///
/// The `Display` form is the exact message shown to the user when a store
/// failure is surfaced in the UI, e.g. "Erreur 404".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The service answered with an HTTP error status.
    #[error("Erreur {0}")]
    Api(u16),
}

impl StoreError {
    pub fn not_found() -> Self {
        Self::Api(404)
    }

    pub fn internal() -> Self {
        Self::Api(500)
    }

    /// Returns the HTTP status carried by the error.
    pub fn status(&self) -> u16 {
        match self {
            Self::Api(status) => *status,
        }
    }
}

/// A receipt file uploaded together with the employee's email.
///
/// This is the payload of the create operation: the store persists the file,
/// allocates an id and returns a draft bill carrying the stored file's URL.
#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    pub email: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Trait for abstracting the bills service.
///
/// Mirrors the remote surface: list all bills, create a bill from a receipt
/// upload, and update a bill record by id.
#[automock]
#[async_trait]
pub trait BillStore: Send + Sync {
    /// Retrieves every bill known to the store.
    async fn list(&self) -> Result<Vec<Bill>, StoreError>;

    /// Persists a receipt file and returns the draft bill created for it.
    async fn create(&self, upload: ReceiptUpload) -> Result<Bill, StoreError>;

    /// Replaces the bill with the same id and returns the stored record.
    async fn update(&self, bill: Bill) -> Result<Bill, StoreError>;
}
