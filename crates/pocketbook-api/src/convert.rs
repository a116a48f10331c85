//! Row → API model mapping. Corrupt stored values are logged and replaced
//! with defaults rather than failing the whole response.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use pocketbook_db::models::{CommentRow, MessageRow, PostRow, UserRow};
use pocketbook_types::api::{
    CommentResponse, MessageResponse, PostResponse, ProfileResponse, PublicProfile,
};
use pocketbook_types::models::Tier;

pub fn uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub fn timestamp(raw: &str) -> DateTime<Utc> {
    pocketbook_db::parse_timestamp(raw).unwrap_or_else(|e| {
        warn!("{}", e);
        DateTime::default()
    })
}

pub fn tier(raw: &str) -> Tier {
    raw.parse().unwrap_or_else(|e| {
        warn!("{}; treating as free", e);
        Tier::Free
    })
}

pub fn profile(row: UserRow) -> ProfileResponse {
    ProfileResponse {
        id: uuid(&row.id, "user id"),
        email: row.email,
        username: row.username,
        display_name: row.display_name,
        bio: row.bio,
        tier: tier(&row.tier),
        balance_cents: row.balance_cents,
        created_at: timestamp(&row.created_at),
    }
}

pub fn public_profile(row: UserRow) -> PublicProfile {
    PublicProfile {
        id: uuid(&row.id, "user id"),
        username: row.username,
        display_name: row.display_name,
        bio: row.bio,
        tier: tier(&row.tier),
        created_at: timestamp(&row.created_at),
    }
}

pub fn post(row: PostRow) -> PostResponse {
    PostResponse {
        id: uuid(&row.id, "post id"),
        author_id: uuid(&row.author_id, "author_id"),
        author_username: row.author_username,
        title: row.title,
        content: row.content,
        image_url: row.image_url,
        like_count: row.like_count,
        comment_count: row.comment_count,
        liked_by_me: row.liked_by_me,
        created_at: timestamp(&row.created_at),
    }
}

pub fn comment(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: uuid(&row.id, "comment id"),
        post_id: uuid(&row.post_id, "post_id"),
        author_id: uuid(&row.author_id, "author_id"),
        author_username: row.author_username,
        content: row.content,
        created_at: timestamp(&row.created_at),
    }
}

pub fn message(row: &MessageRow) -> MessageResponse {
    MessageResponse {
        id: uuid(&row.id, "message id"),
        sender_id: uuid(&row.sender_id, "sender_id"),
        receiver_id: uuid(&row.receiver_id, "receiver_id"),
        content: row.content.clone(),
        is_read: row.is_read,
        created_at: timestamp(&row.created_at),
    }
}
