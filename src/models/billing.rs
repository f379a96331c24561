use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::InvoiceStatus;

/// A charge a doctor raises against a patient they manage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub doctor_id: String,
    pub patient_id: String,
    pub description: String,
    /// Smallest currency unit.
    pub amount_cents: i64,
    pub currency: String,
    pub due_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    pub patient_id: String,
    pub description: String,
    pub amount_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

fn default_currency() -> String {
    "usd".into()
}
