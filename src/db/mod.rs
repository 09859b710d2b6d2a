pub mod affiliatedb;
pub mod db;
pub mod ledgerdb;
pub mod trackingdb;
pub mod webhookdb;

#[cfg(test)]
pub mod memstore;

/// True when the error is a Postgres unique constraint violation (23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

/// True when the error is a Postgres serialization failure (40001), which is
/// safe to retry.
pub fn is_serialization_conflict(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("40001"))
}
