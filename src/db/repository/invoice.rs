use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::*;

const INVOICE_COLUMNS: &str = "id, doctor_id, patient_id, description, amount_cents, currency,
     due_date, status, created_at, updated_at";

fn invoice_from_row(row: &Row<'_>) -> rusqlite::Result<Invoice> {
    Ok(Invoice {
        id: uuid_at(row, 0)?,
        doctor_id: row.get(1)?,
        patient_id: row.get(2)?,
        description: row.get(3)?,
        amount_cents: row.get(4)?,
        currency: row.get(5)?,
        due_date: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Raise an `open` invoice. Fails with a constraint violation unless the
/// doctor manages the patient.
pub fn add_invoice(
    conn: &Connection,
    doctor_id: &str,
    invoice: &NewInvoice,
) -> Result<Option<Invoice>, DatabaseError> {
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO invoices (id, doctor_id, patient_id, description, amount_cents, currency, due_date, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT DO NOTHING
                 RETURNING {INVOICE_COLUMNS}"
            ),
            params![
                Uuid::new_v4().to_string(),
                doctor_id,
                invoice.patient_id,
                invoice.description.trim(),
                invoice.amount_cents,
                invoice.currency.to_lowercase(),
                invoice.due_date,
                InvoiceStatus::Open,
            ],
            invoice_from_row,
        )
        .optional()?;
    Ok(inserted)
}

/// Invoices issued by one doctor or billed to one patient, oldest first.
pub fn get_invoices(conn: &Connection, key: &PartyKey) -> Result<Vec<Invoice>, DatabaseError> {
    let (filter, id) = match key {
        PartyKey::ByPatient(id) => ("patient_id", id),
        PartyKey::ByDoctor(id) => ("doctor_id", id),
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices
         WHERE {filter} = ?1 ORDER BY created_at, rowid"
    ))?;
    let invoices = stmt
        .query_map(params![id], invoice_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(invoices)
}

/// Move one of the doctor's own invoices to `status`. `None` when the
/// doctor issued no invoice with that id.
pub fn set_invoice_status(
    conn: &Connection,
    doctor_id: &str,
    invoice_id: &Uuid,
    status: InvoiceStatus,
) -> Result<Option<Invoice>, DatabaseError> {
    let updated = conn
        .query_row(
            &format!(
                "UPDATE invoices SET status = ?3,
                    updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE id = ?1 AND doctor_id = ?2
                 RETURNING {INVOICE_COLUMNS}"
            ),
            params![invoice_id.to_string(), doctor_id, status],
            invoice_from_row,
        )
        .optional()?;
    Ok(updated)
}
