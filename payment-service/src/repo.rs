use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkPaid {
    Applied,
    NotFound,
}

/// Atomically settle an order after a verified confirmation. One
/// field-scoped statement keyed by id: concurrent verifications race on the
/// same row but COALESCE keeps the first `paid_at`/`payment_id`, so a retry
/// or duplicate callback is a no-op rather than a double-apply.
pub async fn mark_order_paid(
    pool: &PgPool,
    order_id: Uuid,
    payment_id: &str,
) -> Result<MarkPaid, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET \
             is_paid = TRUE, \
             paid_at = COALESCE(paid_at, now()), \
             payment_id = COALESCE(payment_id, $2), \
             payment_status = 'completed', \
             updated_at = now() \
         WHERE id = $1",
    )
    .bind(order_id)
    .bind(payment_id)
    .execute(pool)
    .await?;

    Ok(if result.rows_affected() == 0 {
        MarkPaid::NotFound
    } else {
        MarkPaid::Applied
    })
}
