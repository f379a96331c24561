//! Repository layer: entity-scoped database operations.
//!
//! Every function takes the connection explicitly. Add operations return
//! `Some(row)` when a row was created and `None` when a uniqueness conflict
//! swallowed the insert; foreign-key, CHECK and trigger failures surface as
//! [`DatabaseError::ConstraintViolation`].

mod access_log;
mod allergy;
mod conversation;
mod diagnosis;
mod doctor;
mod emergency_contact;
mod health_info;
mod invoice;
mod management;
mod medication;
mod meeting;
mod patient;
mod relations;
mod role;
mod symptom;
mod user;

use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::DatabaseError;

/// Read a TEXT column holding a UUID.
pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Operations shared by the one-to-many clinical records a patient owns.
pub trait PatientRecord: Sized {
    type New;
    type Update;
    /// Human-readable entity name, used in log lines and error messages.
    const KIND: &'static str;

    fn add(conn: &Connection, patient_id: &str, new: &Self::New)
        -> Result<Option<Self>, DatabaseError>;
    fn list(conn: &Connection, patient_id: &str) -> Result<Vec<Self>, DatabaseError>;
    fn set_one(
        conn: &Connection,
        patient_id: &str,
        id: &Uuid,
        changes: &Self::Update,
    ) -> Result<Option<Self>, DatabaseError>;
    fn bulk_set(
        conn: &Connection,
        patient_id: &str,
        changes: &Self::Update,
    ) -> Result<Vec<Self>, DatabaseError>;
}

pub use access_log::*;
pub use allergy::*;
pub use conversation::*;
pub use diagnosis::*;
pub use doctor::*;
pub use emergency_contact::*;
pub use health_info::*;
pub use invoice::*;
pub use management::*;
pub use medication::*;
pub use meeting::*;
pub use patient::*;
pub use relations::*;
pub use role::*;
pub use symptom::*;
pub use user::*;
