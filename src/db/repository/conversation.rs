use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::*;

const CONVERSATION_COLUMNS: &str = "id, patient_id, doctor_id, created_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, body, sent_at";

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: uuid_at(row, 0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: uuid_at(row, 0)?,
        conversation_id: uuid_at(row, 1)?,
        sender_id: row.get(2)?,
        body: row.get(3)?,
        sent_at: row.get(4)?,
    })
}

/// Open the conversation between a patient and a doctor. A pair has at
/// most one conversation; a second open is a no-op.
pub fn add_conversation(
    conn: &Connection,
    patient_id: &str,
    doctor_id: &str,
) -> Result<Option<Conversation>, DatabaseError> {
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO conversations (id, patient_id, doctor_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT DO NOTHING
                 RETURNING {CONVERSATION_COLUMNS}"
            ),
            params![Uuid::new_v4().to_string(), patient_id, doctor_id],
            conversation_from_row,
        )
        .optional()?;
    Ok(inserted)
}

pub fn get_conversation(
    conn: &Connection,
    conversation_id: &Uuid,
) -> Result<Option<Conversation>, DatabaseError> {
    let conversation = conn
        .query_row(
            &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
            params![conversation_id.to_string()],
            conversation_from_row,
        )
        .optional()?;
    Ok(conversation)
}

pub fn list_conversations(
    conn: &Connection,
    key: &PartyKey,
) -> Result<Vec<Conversation>, DatabaseError> {
    let (filter, id) = match key {
        PartyKey::ByPatient(id) => ("patient_id", id),
        PartyKey::ByDoctor(id) => ("doctor_id", id),
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations
         WHERE {filter} = ?1 ORDER BY created_at, rowid"
    ))?;
    let conversations = stmt
        .query_map(params![id], conversation_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(conversations)
}

/// Append a message. An empty body violates the table's CHECK.
pub fn add_message(
    conn: &Connection,
    conversation_id: &Uuid,
    sender_id: &str,
    body: &str,
) -> Result<Message, DatabaseError> {
    let message = conn.query_row(
        &format!(
            "INSERT INTO messages (id, conversation_id, sender_id, body) VALUES (?1, ?2, ?3, ?4)
             RETURNING {MESSAGE_COLUMNS}"
        ),
        params![
            Uuid::new_v4().to_string(),
            conversation_id.to_string(),
            sender_id,
            body,
        ],
        message_from_row,
    )?;
    Ok(message)
}

/// Messages of a conversation, oldest first.
pub fn get_messages(conn: &Connection, conversation_id: &Uuid) -> Result<Vec<Message>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE conversation_id = ?1 ORDER BY sent_at, rowid"
    ))?;
    let messages = stmt
        .query_map(params![conversation_id.to_string()], message_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}
