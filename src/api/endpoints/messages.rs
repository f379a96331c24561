//! Patient-doctor messaging endpoints.
//!
//! - `POST /api/db/messages/conversations/add`: open a conversation with a linked counterpart
//! - `GET /api/db/messages/conversations/get`: the caller's conversations
//! - `POST /api/db/messages/send`
//! - `GET /api/db/messages/get?conversation_id=`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::{Extension, Json};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use super::caller_role;
use crate::api::error::ApiError;
use crate::api::types::{respond, AddOutcome, ApiContext, CallerContext, Envelope};
use crate::db;
use crate::models::*;

/// Longest message body accepted, in characters.
const MAX_MESSAGE_CHARS: usize = 4_000;

#[derive(Deserialize)]
pub struct OpenConversationRequest {
    /// The doctor when a patient opens it, the patient when a doctor does.
    pub counterpart_id: String,
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub conversation_id: Uuid,
    pub body: String,
}

#[derive(Deserialize)]
pub struct MessagesQuery {
    pub conversation_id: Uuid,
}

/// Load a conversation the caller takes part in.
fn party_conversation(
    conn: &Connection,
    conversation_id: &Uuid,
    user_id: &str,
) -> Result<Conversation, ApiError> {
    let conversation = db::get_conversation(conn, conversation_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Conversation {conversation_id} not found")))?;
    if !conversation.involves(user_id) {
        return Err(ApiError::Forbidden("Not a party to this conversation".into()));
    }
    Ok(conversation)
}

pub async fn open_conversation(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<OpenConversationRequest>, JsonRejection>,
) -> Result<AddOutcome<Conversation>, ApiError> {
    let Json(body) = payload?;
    let conn = ctx.core.open_db()?;
    let (patient_id, doctor_id) = match caller_role(&conn, &caller.user_id)? {
        Role::Patient => (caller.user_id, body.counterpart_id),
        Role::Doctor => (body.counterpart_id, caller.user_id),
    };
    if !db::has_management(&conn, &patient_id, &doctor_id)? {
        return Err(ApiError::Forbidden(
            "Patient and doctor are not linked".into(),
        ));
    }
    let row = db::add_conversation(&conn, &patient_id, &doctor_id)?;
    Ok(AddOutcome::new("conversation", row))
}

pub async fn conversations(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Envelope<Vec<Conversation>>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let role = caller_role(&conn, &caller.user_id)?;
    let key = PartyKey::for_role(role, &caller.user_id);
    Ok(respond(db::list_conversations(&conn, &key)?))
}

pub async fn send(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    let Json(request) = payload?;
    let body = request.body.trim();
    if body.is_empty() {
        return Err(ApiError::BadRequest("Message body must not be empty".into()));
    }
    if body.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Message body exceeds {MAX_MESSAGE_CHARS} characters"
        )));
    }
    let conn = ctx.core.open_db()?;
    party_conversation(&conn, &request.conversation_id, &caller.user_id)?;
    let message = db::add_message(&conn, &request.conversation_id, &caller.user_id, body)?;
    Ok(respond(message))
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<Message>>>, ApiError> {
    let Query(query) = query?;
    let conn = ctx.core.open_db()?;
    party_conversation(&conn, &query.conversation_id, &caller.user_id)?;
    Ok(respond(db::get_messages(&conn, &query.conversation_id)?))
}
