use common_auth::{Claims, Subject};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OwnerError {
    #[error("no persisted administrative identity available")]
    NoValidOwner,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Resolve the identity that will own an order.
///
/// An explicit customer reference (admin-assisted / counter sales) wins when
/// it names a persisted user; otherwise the session identity is used. The
/// break-glass credential is not a `users` row, so orders it places are owned
/// by the earliest persisted admin; with no such row, creation must abort.
pub async fn resolve_owner(
    pool: &PgPool,
    claims: &Claims,
    explicit_customer: Option<Uuid>,
) -> Result<Uuid, OwnerError> {
    if let Some(candidate) = explicit_customer {
        if user_exists(pool, candidate).await? {
            return Ok(candidate);
        }
    }

    match claims.subject {
        Subject::User(id) => Ok(id),
        Subject::Fallback => first_persisted_admin(pool)
            .await?
            .ok_or(OwnerError::NoValidOwner),
    }
}

async fn user_exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

async fn first_persisted_admin(pool: &PgPool) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM users WHERE role = 'admin' ORDER BY created_at ASC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}
