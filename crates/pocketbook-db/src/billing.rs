use crate::models::CheckoutRow;
use crate::{Database, OptionalExt};
use anyhow::Result;
use pocketbook_types::models::CheckoutStatus;
use rusqlite::{Connection, TransactionBehavior};

/// Result of applying a provider callback to a checkout.
#[derive(Debug)]
pub enum CheckoutCompletion {
    Missing,
    /// The checkout had already been settled; nothing changed.
    AlreadySettled(CheckoutRow),
    Settled(CheckoutRow),
}

impl Database {
    pub fn create_checkout(&self, id: &str, user_id: &str, tier: &str, amount_cents: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO checkouts (id, user_id, tier, amount_cents) VALUES (?1, ?2, ?3, ?4)",
                (id, user_id, tier, amount_cents),
            )?;
            Ok(())
        })
    }

    /// Settle a pending checkout. A paid checkout upgrades the user's tier in
    /// the same transaction; a settled checkout is never applied twice.
    pub fn complete_checkout(&self, id: &str, paid: bool) -> Result<CheckoutCompletion> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(row) = select_checkout(&tx, id)? else {
                return Ok(CheckoutCompletion::Missing);
            };
            if row.status != CheckoutStatus::Pending.as_str() {
                return Ok(CheckoutCompletion::AlreadySettled(row));
            }

            let status = if paid { CheckoutStatus::Paid } else { CheckoutStatus::Failed };
            tx.execute(
                "UPDATE checkouts
                 SET status = ?2, completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                (id, status.as_str()),
            )?;
            if paid {
                tx.execute("UPDATE users SET tier = ?2 WHERE id = ?1", (&row.user_id, &row.tier))?;
            }

            let settled = select_checkout(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("checkout {} vanished while settling", id))?;
            tx.commit()?;

            Ok(CheckoutCompletion::Settled(settled))
        })
    }
}

fn select_checkout(conn: &Connection, id: &str) -> Result<Option<CheckoutRow>> {
    conn.query_row(
        "SELECT id, user_id, tier, amount_cents, status, created_at, completed_at
         FROM checkouts WHERE id = ?1",
        [id],
        checkout_from_row,
    )
    .optional()
}

fn checkout_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CheckoutRow> {
    Ok(CheckoutRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        tier: row.get(2)?,
        amount_cents: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        completed_at: row.get(6)?,
    })
}
