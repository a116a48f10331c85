use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::MessageResponse;

/// Events pushed to a single user over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms the connection is authenticated
    Ready { user_id: Uuid, username: String },

    /// Someone sent the user a private message
    MessageCreate {
        message: MessageResponse,
        sender_username: String,
    },

    /// The receiver opened the conversation and read the user's messages
    MessagesRead { reader_id: Uuid, count: usize },

    /// Someone liked one of the user's posts
    PostLiked {
        post_id: Uuid,
        user_id: Uuid,
        username: String,
        like_count: i64,
    },

    /// Someone commented on one of the user's posts
    CommentCreate {
        post_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
        author_username: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged() {
        let event = GatewayEvent::MessagesRead {
            reader_id: Uuid::nil(),
            count: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MessagesRead");
        assert_eq!(json["data"]["count"], 3);
    }
}
