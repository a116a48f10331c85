use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use pocketbook_db::models::MessageRow;
use pocketbook_types::api::{
    ConversationSummary, LastMessage, MessageResponse, SendMessageRequest, UnreadResponse,
};
use pocketbook_types::events::GatewayEvent;

use crate::convert;
use crate::error::{ApiError, Path, Payload, Query};
use crate::middleware::Claims;
use crate::posts::check_length;
use crate::state::{AppState, run_db};

const MAX_MESSAGE: usize = 4_000;

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Payload(req): Payload<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.receiver_id == claims.sub {
        return Err(ApiError::bad_request("cannot message yourself"));
    }
    let content = req.content.trim().to_string();
    check_length("content", &content, MAX_MESSAGE)?;

    let mid = Uuid::new_v4().to_string();
    let sid = claims.sub.to_string();
    let rid = req.receiver_id.to_string();

    let row = run_db(&state, move |db| {
        if db.get_user_by_id(&rid)?.is_none() {
            return Ok(None);
        }
        db.insert_message(&mid, &sid, &rid, &content)?;
        let row = db
            .get_message(&mid)?
            .ok_or_else(|| anyhow::anyhow!("message {} vanished after insert", mid))?;
        Ok(Some(row))
    })
    .await?
    .ok_or(ApiError::NotFound)?;
    let message = convert::message(&row);

    state
        .dispatcher
        .send_to_user(
            req.receiver_id,
            GatewayEvent::MessageCreate {
                message: message.clone(),
                sender_username: claims.username.clone(),
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = {
        let uid = uid.clone();
        run_db(&state, move |db| db.get_messages_for_user(&uid)).await?
    };
    Ok(Json(group_conversations(&uid, rows)))
}

/// Messages between the caller and one other user, oldest first. Opening the
/// conversation marks the other user's messages to the caller as read.
pub async fn conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(other_id): Path<Uuid>,
    Query(query): Query<ConversationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let other = other_id.to_string();
    let limit = query.limit.clamp(1, 500);

    let (marked, rows) = run_db(&state, move |db| {
        if db.get_user_by_id(&other)?.is_none() {
            return Ok(None);
        }
        let marked = db.mark_conversation_read(&me, &other)?;
        let rows = db.get_conversation(&me, &other, limit)?;
        Ok(Some((marked, rows)))
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    if marked > 0 {
        state
            .dispatcher
            .send_to_user(
                other_id,
                GatewayEvent::MessagesRead {
                    reader_id: claims.sub,
                    count: marked,
                },
            )
            .await;
    }

    let messages: Vec<MessageResponse> = rows.iter().map(convert::message).collect();
    Ok(Json(messages))
}

pub async fn unread(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let unread = run_db(&state, move |db| db.count_unread(&uid)).await?;
    Ok(Json(UnreadResponse { unread }))
}

/// Fold a user's messages (oldest first) into one summary per counterpart,
/// most recently active conversation first.
pub fn group_conversations(me: &str, rows: Vec<MessageRow>) -> Vec<ConversationSummary> {
    let mut by_partner: HashMap<String, ConversationSummary> = HashMap::new();

    for row in rows {
        let (partner_id, partner_username) = if row.sender_id == me {
            (row.receiver_id.clone(), row.receiver_username.clone())
        } else {
            (row.sender_id.clone(), row.sender_username.clone())
        };
        let unread = row.receiver_id == me && !row.is_read;
        let last = LastMessage {
            sender_id: convert::uuid(&row.sender_id, "sender_id"),
            content: row.content,
            created_at: convert::timestamp(&row.created_at),
        };

        let summary = by_partner
            .entry(partner_id)
            .or_insert_with_key(|id| ConversationSummary {
                participant_id: convert::uuid(id, "participant id"),
                participant_username: partner_username,
                last_message: last.clone(),
                message_count: 0,
                unread_count: 0,
            });
        summary.message_count += 1;
        if unread {
            summary.unread_count += 1;
        }
        summary.last_message = last;
    }

    let mut summaries: Vec<ConversationSummary> = by_partner.into_values().collect();
    summaries.sort_by(|a, b| {
        b.last_message
            .created_at
            .cmp(&a.last_message.created_at)
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: &str = "00000000-0000-0000-0000-00000000000a";
    const BOB: &str = "00000000-0000-0000-0000-00000000000b";
    const CAROL: &str = "00000000-0000-0000-0000-00000000000c";

    fn row(id: &str, from: &str, to: &str, is_read: bool, at: &str) -> MessageRow {
        let name = |uid: &str| match uid {
            ME => "me",
            BOB => "bob",
            _ => "carol",
        };
        MessageRow {
            id: id.into(),
            sender_id: from.into(),
            sender_username: name(from).into(),
            receiver_id: to.into(),
            receiver_username: name(to).into(),
            content: format!("msg {}", id),
            is_read,
            created_at: at.into(),
        }
    }

    #[test]
    fn groups_by_counterpart_with_unread_counts() {
        let rows = vec![
            row("1", BOB, ME, true, "2026-10-01T10:00:00.000Z"),
            row("2", ME, BOB, false, "2026-10-01T10:05:00.000Z"),
            row("3", CAROL, ME, false, "2026-10-02T09:00:00.000Z"),
            row("4", BOB, ME, false, "2026-10-03T08:00:00.000Z"),
            row("5", BOB, ME, false, "2026-10-03T08:01:00.000Z"),
        ];

        let summaries = group_conversations(ME, rows);
        assert_eq!(summaries.len(), 2);

        let bob = &summaries[0];
        assert_eq!(bob.participant_username, "bob");
        assert_eq!(bob.message_count, 4);
        // message 2 is unread but was sent by me, so it does not count
        assert_eq!(bob.unread_count, 2);
        assert_eq!(bob.last_message.content, "msg 5");

        let carol = &summaries[1];
        assert_eq!(carol.participant_username, "carol");
        assert_eq!(carol.unread_count, 1);
    }

    #[test]
    fn ties_break_on_participant_id() {
        let at = "2026-10-01T10:00:00.000Z";
        let rows = vec![row("1", CAROL, ME, true, at), row("2", BOB, ME, true, at)];
        let summaries = group_conversations(ME, rows);
        assert_eq!(summaries[0].participant_username, "bob");
        assert_eq!(summaries[1].participant_username, "carol");
    }

    #[test]
    fn no_messages_no_conversations() {
        assert!(group_conversations(ME, Vec::new()).is_empty());
    }
}
