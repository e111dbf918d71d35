use serde::{Deserialize, Serialize};

use crate::store::{BillStore, ReceiptUpload, StoreError};

pub mod api;
pub mod web;

/// Review status of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Pending,
    Accepted,
    Refused,
}

impl BillStatus {
    /// Human label shown in the bills table.
    pub fn label(&self) -> &'static str {
        match self {
            BillStatus::Pending => "En attente",
            BillStatus::Accepted => "Accepté",
            BillStatus::Refused => "Refusé",
        }
    }

    /// CSS class of the status badge.
    pub fn badge_class(&self) -> &'static str {
        match self {
            BillStatus::Pending => "badge-pending",
            BillStatus::Accepted => "badge-accepted",
            BillStatus::Refused => "badge-refused",
        }
    }
}

/// An expense-note record submitted by an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: String,
    pub email: String,
    #[serde(rename = "type")]
    pub expense_type: String,
    pub name: String,
    pub amount: f64,
    /// ISO-like date string, e.g. "2004-04-04". Kept raw so that a record
    /// with an unparseable date still renders.
    pub date: String,
    pub vat: String,
    pub pct: u32,
    pub commentary: String,
    pub file_url: String,
    pub file_name: String,
    pub status: BillStatus,
}

const FRENCH_MONTHS: [&str; 12] = [
    "Jan.", "Fév.", "Mar.", "Avr.", "Mai", "Juin", "Juil.", "Aoû.", "Sep.", "Oct.", "Nov.", "Déc.",
];

/// Formats an ISO date for display, e.g. "2004-04-04" -> "4 Avr. 04".
/// An unparseable date is returned as-is rather than failing the render.
pub fn format_date(raw: &str) -> String {
    use chrono::Datelike;

    match raw.parse::<chrono::NaiveDate>() {
        Ok(date) => format!(
            "{} {} {:02}",
            date.day(),
            FRENCH_MONTHS[date.month0() as usize],
            date.year() % 100,
        ),
        Err(_) => raw.to_string(),
    }
}

/// Sorts bills by date, most recent first. Dates that parse are compared as
/// dates; when either side does not parse, the raw strings are compared
/// instead so that malformed records keep a stable position.
pub fn sort_bills_latest_first(bills: &mut [Bill]) {
    bills.sort_by(|a, b| {
        match (
            a.date.parse::<chrono::NaiveDate>(),
            b.date.parse::<chrono::NaiveDate>(),
        ) {
            (Ok(da), Ok(db)) => db.cmp(&da),
            _ => b.date.cmp(&a.date),
        }
    });
}

/// File extensions accepted for an uploaded receipt.
const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Returns whether a receipt upload is accepted. The extension must be jpg,
/// jpeg or png, and when the browser supplies a MIME type it must agree.
pub fn receipt_file_accepted(file_name: &str, content_type: Option<&str>) -> bool {
    let extension_ok = file_extension(file_name)
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);

    let mime_ok = match content_type {
        Some(mime) => matches!(mime, "image/jpeg" | "image/png"),
        None => true,
    };

    extension_ok && mime_ok
}

/// Returns whether the receipt can be shown inline in the preview modal.
/// Non-image files degrade to a download link.
pub fn is_displayable_image(file_name: &str) -> bool {
    file_extension(file_name)
        .map(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "gif"))
        .unwrap_or(false)
}

fn file_extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Error type for BillService operations.
#[derive(Debug, thiserror::Error)]
pub enum BillServiceError {
    /// The store rejected the call; the message is shown verbatim.
    #[error("{0}")]
    Store(#[from] StoreError),
    /// The uploaded receipt is not an accepted file type.
    #[error("Le justificatif '{file_name}' doit être au format jpg, jpeg ou png")]
    UnsupportedReceipt { file_name: String },
    /// The submission carried no receipt file.
    #[error("Aucun justificatif fourni")]
    MissingReceipt,
}

/// Fields of a new bill as submitted from the form, before the store has
/// assigned an id and a file URL.
#[derive(Debug, Clone)]
pub struct NewBillDraft {
    pub email: String,
    pub expense_type: String,
    pub name: String,
    pub amount: f64,
    pub date: String,
    pub vat: String,
    pub pct: u32,
    pub commentary: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub file_bytes: Vec<u8>,
}

pub struct BillService<'a> {
    store: &'a dyn BillStore,
}

impl<'a> BillService<'a> {
    pub fn new(store: &'a dyn BillStore) -> BillService<'a> {
        BillService { store }
    }

    /// Retrieves all bills from the store, most recent first.
    #[tracing::instrument(skip(self))]
    pub async fn list_bills(&self) -> Result<Vec<Bill>, BillServiceError> {
        let mut bills = self.store.list().await?;
        sort_bills_latest_first(&mut bills);
        Ok(bills)
    }

    /// Retrieves a single bill by id.
    ///
    /// The store surface has no point lookup, so the list is scanned; an
    /// unknown id reads as a 404 from the caller's point of view.
    #[tracing::instrument(skip(self))]
    pub async fn find_bill(&self, id: &str) -> Result<Bill, BillServiceError> {
        let bills = self.store.list().await?;
        bills
            .into_iter()
            .find(|bill| bill.id == id)
            .ok_or_else(|| BillServiceError::Store(StoreError::not_found()))
    }

    /// Submits a new bill: validates the receipt, uploads it through the
    /// store's create operation, then fills in the expense fields with an
    /// update. The stored record always starts out pending.
    #[tracing::instrument(skip(self, draft), fields(file_name = %draft.file_name))]
    pub async fn submit_bill(&self, draft: NewBillDraft) -> Result<Bill, BillServiceError> {
        if draft.file_name.is_empty() {
            return Err(BillServiceError::MissingReceipt);
        }
        if !receipt_file_accepted(&draft.file_name, draft.content_type.as_deref()) {
            return Err(BillServiceError::UnsupportedReceipt {
                file_name: draft.file_name,
            });
        }

        let created = self
            .store
            .create(ReceiptUpload {
                email: draft.email.clone(),
                file_name: draft.file_name.clone(),
                content_type: draft.content_type.clone(),
                bytes: draft.file_bytes,
            })
            .await?;

        let bill = Bill {
            id: created.id,
            email: draft.email,
            expense_type: draft.expense_type,
            name: draft.name,
            amount: draft.amount,
            date: draft.date,
            vat: draft.vat,
            pct: draft.pct,
            commentary: draft.commentary,
            file_url: created.file_url,
            file_name: created.file_name,
            status: BillStatus::Pending,
        };

        let stored = self.store.update(bill).await?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockBillStore;

    fn bill(id: &str, date: &str) -> Bill {
        Bill {
            id: id.to_string(),
            email: "a@a".to_string(),
            expense_type: "Transports".to_string(),
            name: "test".to_string(),
            amount: 100.0,
            date: date.to_string(),
            vat: "20".to_string(),
            pct: 20,
            commentary: String::new(),
            file_url: "https://storage.billed.local/x/note.png".to_string(),
            file_name: "note.png".to_string(),
            status: BillStatus::Pending,
        }
    }

    fn png_draft() -> NewBillDraft {
        NewBillDraft {
            email: "employee@billed.fr".to_string(),
            expense_type: "Restaurants et bars".to_string(),
            name: "Déjeuner client".to_string(),
            amount: 42.0,
            date: "2024-03-01".to_string(),
            vat: "20".to_string(),
            pct: 20,
            commentary: "client".to_string(),
            file_name: "justificatif.png".to_string(),
            content_type: Some("image/png".to_string()),
            file_bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn formats_iso_dates_in_french_short_form() {
        assert_eq!(format_date("2004-04-04"), "4 Avr. 04");
        assert_eq!(format_date("2021-11-08"), "8 Nov. 21");
    }

    #[test]
    fn malformed_date_falls_back_to_raw_string() {
        assert_eq!(format_date("pas une date"), "pas une date");
        assert_eq!(format_date(""), "");
    }

    #[test]
    fn sorts_bills_most_recent_first() {
        let mut bills = vec![
            bill("a", "2001-01-01"),
            bill("b", "2004-04-04"),
            bill("c", "2002-02-02"),
            bill("d", "2003-03-03"),
        ];
        sort_bills_latest_first(&mut bills);
        let dates: Vec<&str> = bills.iter().map(|b| b.date.as_str()).collect();
        assert_eq!(dates, ["2004-04-04", "2003-03-03", "2002-02-02", "2001-01-01"]);
    }

    #[test]
    fn sorting_tolerates_malformed_dates() {
        let mut bills = vec![
            bill("a", "garbage"),
            bill("b", "2004-04-04"),
            bill("c", "2001-01-01"),
        ];
        sort_bills_latest_first(&mut bills);
        // Raw string comparison still yields a deterministic order.
        assert_eq!(bills[0].date, "garbage");
        assert_eq!(bills[1].date, "2004-04-04");
        assert_eq!(bills[2].date, "2001-01-01");
    }

    #[test]
    fn status_maps_to_label_and_badge() {
        assert_eq!(BillStatus::Pending.label(), "En attente");
        assert_eq!(BillStatus::Accepted.label(), "Accepté");
        assert_eq!(BillStatus::Refused.label(), "Refusé");
        assert_eq!(BillStatus::Refused.badge_class(), "badge-refused");
    }

    #[test]
    fn accepts_jpg_jpeg_and_png_receipts_only() {
        assert!(receipt_file_accepted("note.png", Some("image/png")));
        assert!(receipt_file_accepted("note.JPG", None));
        assert!(receipt_file_accepted("note.jpeg", Some("image/jpeg")));
        assert!(!receipt_file_accepted("note.pdf", Some("application/pdf")));
        assert!(!receipt_file_accepted("note", None));
        // Extension and MIME type must agree.
        assert!(!receipt_file_accepted("note.png", Some("application/pdf")));
    }

    #[test]
    fn non_image_receipts_are_not_displayable() {
        assert!(is_displayable_image("note.png"));
        assert!(is_displayable_image("scan.GIF"));
        assert!(!is_displayable_image("facture.pdf"));
    }

    #[tokio::test]
    async fn list_bills_returns_store_bills_sorted() {
        let mut store = MockBillStore::new();
        store.expect_list().times(1).returning(|| {
            Ok(vec![bill("a", "2001-01-01"), bill("b", "2004-04-04")])
        });

        let service = BillService::new(&store);
        let bills = service.list_bills().await.unwrap();
        assert_eq!(bills[0].id, "b");
        assert_eq!(bills[1].id, "a");
    }

    #[tokio::test]
    async fn find_bill_reports_unknown_id_as_404() {
        let mut store = MockBillStore::new();
        store
            .expect_list()
            .returning(|| Ok(vec![bill("a", "2001-01-01")]));

        let service = BillService::new(&store);
        let err = service.find_bill("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Erreur 404");
    }

    #[tokio::test]
    async fn submit_bill_uploads_then_updates_with_pending_status() {
        let mut store = MockBillStore::new();
        store
            .expect_create()
            .times(1)
            .withf(|upload| upload.file_name == "justificatif.png" && upload.email == "employee@billed.fr")
            .returning(|upload| {
                let mut draft = bill("fresh-id", "");
                draft.file_name = upload.file_name;
                draft.file_url =
                    format!("https://storage.billed.local/fresh-id/{}", "justificatif.png");
                Ok(draft)
            });
        store
            .expect_update()
            .times(1)
            .withf(|bill| {
                bill.id == "fresh-id"
                    && bill.status == BillStatus::Pending
                    && bill.file_name == "justificatif.png"
                    && bill.email == "employee@billed.fr"
            })
            .returning(Ok);

        let service = BillService::new(&store);
        let stored = service.submit_bill(png_draft()).await.unwrap();
        assert_eq!(stored.status, BillStatus::Pending);
        assert_eq!(stored.file_name, "justificatif.png");
    }

    #[tokio::test]
    async fn submit_bill_rejects_unsupported_receipt_without_calling_store() {
        let store = MockBillStore::new();
        let service = BillService::new(&store);

        let mut draft = png_draft();
        draft.file_name = "facture.pdf".to_string();
        draft.content_type = Some("application/pdf".to_string());

        let err = service.submit_bill(draft).await.unwrap_err();
        assert!(matches!(err, BillServiceError::UnsupportedReceipt { .. }));
        assert!(err.to_string().contains("facture.pdf"));
    }

    #[tokio::test]
    async fn submit_bill_surfaces_store_rejection() {
        let mut store = MockBillStore::new();
        store
            .expect_create()
            .returning(|_| Err(StoreError::internal()));

        let service = BillService::new(&store);
        let err = service.submit_bill(png_draft()).await.unwrap_err();
        assert_eq!(err.to_string(), "Erreur 500");
    }
}
