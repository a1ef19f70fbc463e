//! Processed payment webhook events (idempotency ledger)

use sqlx::PgConnection;

/// Record an event id. Returns `false` if it was already processed.
/// Runs in the same transaction as the event's effects.
pub async fn record(
    conn: &mut PgConnection,
    event_id: &str,
    event_type: &str,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
         VALUES ($1, $2, $3)
         ON CONFLICT (event_id) DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
