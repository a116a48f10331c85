//! Database row types, mapped directly from SQLite rows.
//! Distinct from pocketbook-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub tier: String,
    pub balance_cents: i64,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    /// Whether the viewing user has liked the post.
    pub liked_by_me: bool,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub receiver_id: String,
    pub receiver_username: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

pub struct DashboardRow {
    pub user_id: String,
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub savings: f64,
    pub investments: f64,
    pub debts: f64,
    pub emergency_fund: f64,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutRow {
    pub id: String,
    pub user_id: String,
    pub tier: String,
    pub amount_cents: i64,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}
