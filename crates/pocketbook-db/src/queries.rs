use crate::models::{DashboardRow, UserRow};
use crate::{Database, OptionalExt};
use anyhow::Result;
use pocketbook_types::api::DashboardRequest;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str =
    "id, email, username, password, display_name, bio, tier, balance_cents, created_at";

/// Outcome of inserting a new account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewUser {
    Created,
    EmailTaken,
    UsernameTaken,
}

impl Database {
    // -- Users --

    /// Insert an account unless the email or username is already in use.
    /// The lookup and the insert happen under one connection lock, so
    /// concurrent registrations cannot both pass the check.
    pub fn create_user(&self, id: &str, email: &str, username: &str, password_hash: &str) -> Result<NewUser> {
        self.with_conn(|conn| {
            if query_user(conn, "email", email)?.is_some() {
                return Ok(NewUser::EmailTaken);
            }
            if query_user(conn, "username", username)?.is_some() {
                return Ok(NewUser::UsernameTaken);
            }
            conn.execute(
                "INSERT INTO users (id, email, username, password) VALUES (?1, ?2, ?3, ?4)",
                (id, email, username, password_hash),
            )?;
            Ok(NewUser::Created)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Overwrite the provided profile fields, leaving `None` fields untouched.
    /// Returns false when the user does not exist.
    pub fn update_profile(
        &self,
        id: &str,
        display_name: Option<&str>,
        bio: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET display_name = COALESCE(?2, display_name),
                     bio = COALESCE(?3, bio)
                 WHERE id = ?1",
                (id, display_name, bio),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_tier(&self, id: &str, tier: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE users SET tier = ?2 WHERE id = ?1", (id, tier))?;
            Ok(changed > 0)
        })
    }

    /// Users whose username starts with `prefix`, alphabetically.
    pub fn search_users(&self, prefix: &str, limit: u32) -> Result<Vec<UserRow>> {
        let pattern = format!("{}%", escape_like(prefix));
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE username LIKE ?1 ESCAPE '\\' ORDER BY username LIMIT ?2",
                USER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map((pattern, limit), user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Dashboards --

    pub fn get_dashboard(&self, user_id: &str) -> Result<Option<DashboardRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, monthly_income, monthly_expenses, savings, investments, debts,
                        emergency_fund, updated_at
                 FROM dashboards WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(DashboardRow {
                        user_id: row.get(0)?,
                        monthly_income: row.get(1)?,
                        monthly_expenses: row.get(2)?,
                        savings: row.get(3)?,
                        investments: row.get(4)?,
                        debts: row.get(5)?,
                        emergency_fund: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Last write wins: the snapshot row is replaced wholesale.
    pub fn upsert_dashboard(&self, user_id: &str, values: &DashboardRequest) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO dashboards (user_id, monthly_income, monthly_expenses, savings,
                                         investments, debts, emergency_fund)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id) DO UPDATE SET
                     monthly_income = excluded.monthly_income,
                     monthly_expenses = excluded.monthly_expenses,
                     savings = excluded.savings,
                     investments = excluded.investments,
                     debts = excluded.debts,
                     emergency_fund = excluded.emergency_fund,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                rusqlite::params![
                    user_id,
                    values.monthly_income,
                    values.monthly_expenses,
                    values.savings,
                    values.investments,
                    values.debts,
                    values.emergency_fund,
                ],
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], user_from_row).optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        password: row.get(3)?,
        display_name: row.get(4)?,
        bio: row.get(5)?,
        tier: row.get(6)?,
        balance_cents: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
