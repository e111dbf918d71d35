//! Seeded in-memory implementation of [`BillStore`].
//!
//! Stands in for the remote bills service so the app runs self-contained.
//! Receipt bytes are not retained; only the metadata a rendered bill needs.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::bill::{Bill, BillStatus};
use crate::store::{BillStore, ReceiptUpload, StoreError};

pub struct MemoryStore {
    bills: RwLock<Vec<Bill>>,
}

impl MemoryStore {
    pub fn new(bills: Vec<Bill>) -> Self {
        Self {
            bills: RwLock::new(bills),
        }
    }

    /// An empty store.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// A store seeded with a handful of already-reviewed bills, so a fresh
    /// instance has something to show on the bills page.
    pub fn seeded() -> Self {
        Self::new(fixture_bills())
    }

    fn storage_url(id: &str, file_name: &str) -> String {
        format!("https://storage.billed.local/{id}/{file_name}")
    }
}

#[async_trait]
impl BillStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Bill>, StoreError> {
        let bills = self.bills.read().map_err(|_| StoreError::internal())?;
        Ok(bills.clone())
    }

    async fn create(&self, upload: ReceiptUpload) -> Result<Bill, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let draft = Bill {
            file_url: Self::storage_url(&id, &upload.file_name),
            id,
            email: upload.email,
            expense_type: String::new(),
            name: String::new(),
            amount: 0.0,
            date: String::new(),
            vat: String::new(),
            pct: 0,
            commentary: String::new(),
            file_name: upload.file_name,
            status: BillStatus::Pending,
        };

        let mut bills = self.bills.write().map_err(|_| StoreError::internal())?;
        bills.push(draft.clone());
        Ok(draft)
    }

    async fn update(&self, bill: Bill) -> Result<Bill, StoreError> {
        let mut bills = self.bills.write().map_err(|_| StoreError::internal())?;
        let slot = bills
            .iter_mut()
            .find(|stored| stored.id == bill.id)
            .ok_or_else(StoreError::not_found)?;
        *slot = bill.clone();
        Ok(bill)
    }
}

/// Bills every fresh instance starts with.
pub fn fixture_bills() -> Vec<Bill> {
    vec![
        Bill {
            id: "47qAXb6fIm2zOKkLzMro".to_string(),
            email: "a@a".to_string(),
            expense_type: "Hôtel et logement".to_string(),
            name: "encore".to_string(),
            amount: 400.0,
            date: "2004-04-04".to_string(),
            vat: "80".to_string(),
            pct: 20,
            commentary: "séminaire billed".to_string(),
            file_url: "https://storage.billed.local/47qAXb6fIm2zOKkLzMro/preview-facture.jpg"
                .to_string(),
            file_name: "preview-facture.jpg".to_string(),
            status: BillStatus::Pending,
        },
        Bill {
            id: "BeKy5Mo4jkmdfPGYpTxZ".to_string(),
            email: "a@a".to_string(),
            expense_type: "Services en ligne".to_string(),
            name: "test1".to_string(),
            amount: 100.0,
            date: "2001-01-01".to_string(),
            vat: "10".to_string(),
            pct: 20,
            commentary: "plop".to_string(),
            file_url: "https://storage.billed.local/BeKy5Mo4jkmdfPGYpTxZ/facture-client.jpg"
                .to_string(),
            file_name: "facture-client.jpg".to_string(),
            status: BillStatus::Refused,
        },
        Bill {
            id: "UIUZtnPQvnbFnB0ozvJh".to_string(),
            email: "a@a".to_string(),
            expense_type: "Restaurants et bars".to_string(),
            name: "test3".to_string(),
            amount: 300.0,
            date: "2003-03-03".to_string(),
            vat: "60".to_string(),
            pct: 20,
            commentary: "déjeuner équipe".to_string(),
            file_url: "https://storage.billed.local/UIUZtnPQvnbFnB0ozvJh/note-restaurant.png"
                .to_string(),
            file_name: "note-restaurant.png".to_string(),
            status: BillStatus::Accepted,
        },
        Bill {
            id: "qcCK3SzECmaZAGRrHjaC".to_string(),
            email: "a@a".to_string(),
            expense_type: "Transports".to_string(),
            name: "test2".to_string(),
            amount: 200.0,
            date: "2002-02-02".to_string(),
            vat: "40".to_string(),
            pct: 20,
            commentary: "billet paris-lyon".to_string(),
            file_url: "https://storage.billed.local/qcCK3SzECmaZAGRrHjaC/billet-train.jpg"
                .to_string(),
            file_name: "billet-train.jpg".to_string(),
            status: BillStatus::Refused,
        },
    ]
}
