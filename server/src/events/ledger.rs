//! Reservation Ledger
//!
//! Capacity-bounded RSVPs with a FIFO waitlist. Every operation runs as one
//! SERIALIZABLE transaction; serialization failures and deadlocks are retried
//! a bounded number of times with jittered exponential backoff.
//!
//! Writers queue on a `SHARE ROW EXCLUSIVE` lock of `event_rsvps` taken before
//! the first read, so each one counts places against a snapshot that already
//! includes the previous writer's commit. The lock must precede any `SELECT`:
//! a SERIALIZABLE snapshot is fixed when the first query starts, and a row lock
//! waited on inside that query would still leave a stale count behind.
//!
//! The partial unique index `event_rsvps_active_unique` is what guarantees a
//! single live reservation per (event, user); the in-transaction lookup only
//! saves a failed insert.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{CancelOutcome, Rsvp, RsvpStatus};
use crate::config::Config;

const ACTIVE_UNIQUE_INDEX: &str = "event_rsvps_active_unique";
const CAPACITY_CONSTRAINT: &str = "event_rsvps_capacity";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Event not found")]
    EventNotFound,

    #[error("Reservation not found")]
    ReservationNotFound,

    #[error("A live reservation already exists for this user and event")]
    DuplicateReservation,

    /// Storage rejected a GOING row over capacity.
    #[error("Event capacity exceeded")]
    CapacityExceeded,

    /// Retries exhausted or an attempt timed out.
    #[error("Concurrent update conflict")]
    TransientConflict,

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() && db_err.constraint() == Some(ACTIVE_UNIQUE_INDEX) {
                return Self::DuplicateReservation;
            }
            if db_err.is_check_violation() && db_err.constraint() == Some(CAPACITY_CONSTRAINT) {
                return Self::CapacityExceeded;
            }
        }
        Self::Database(err)
    }
}

impl LedgerError {
    /// Whether the failed attempt may be retried from scratch.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db_err)) => db_err
                .code()
                .is_some_and(|code| is_retryable_sqlstate(&code)),
            _ => false,
        }
    }
}

/// `serialization_failure` and `deadlock_detected`.
#[must_use]
pub fn is_retryable_sqlstate(code: &str) -> bool {
    matches!(code, "40001" | "40P01")
}

/// Retry and timeout policy.
#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff_base: Duration,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(5),
            backoff_base: Duration::from_millis(20),
        }
    }
}

impl LedgerSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.rsvp_max_attempts.max(1),
            attempt_timeout: Duration::from_millis(config.rsvp_timeout_ms),
            backoff_base: Duration::from_millis(config.rsvp_retry_backoff_ms),
        }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32, jitter: Duration) -> Duration {
        let exponent = attempt.saturating_sub(1).min(6);
        self.backoff_base.saturating_mul(1 << exponent) + jitter
    }

    fn backoff_base_ms(&self) -> u64 {
        u64::try_from(self.backoff_base.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Transactional owner of event reservations.
#[derive(Debug, Clone)]
pub struct ReservationLedger {
    pool: PgPool,
    settings: LedgerSettings,
}

impl ReservationLedger {
    #[must_use]
    pub const fn new(pool: PgPool, settings: LedgerSettings) -> Self {
        Self { pool, settings }
    }

    /// Reserve a place for `user_id`: GOING while capacity remains, WAITLIST after.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        requested_at: DateTime<Utc>,
    ) -> Result<Rsvp, LedgerError> {
        let pool = &self.pool;
        let rsvp = self
            .run("reserve", move || reserve_once(pool, event_id, user_id, requested_at))
            .await?;

        info!(rsvp_id = %rsvp.id, status = ?rsvp.status, "Reservation recorded");
        Ok(rsvp)
    }

    /// Cancel a reservation, promoting the oldest waitlisted one if a GOING
    /// place was freed. Cancelling twice returns the cancelled row unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, rsvp_id: Uuid) -> Result<CancelOutcome, LedgerError> {
        let pool = &self.pool;
        let outcome = self.run("cancel", move || cancel_once(pool, rsvp_id)).await?;

        if let Some(promoted) = &outcome.promoted {
            info!(
                event_id = %promoted.event_id,
                promoted_rsvp_id = %promoted.id,
                "Promoted waitlisted reservation"
            );
        }
        Ok(outcome)
    }

    pub async fn find(&self, rsvp_id: Uuid) -> Result<Option<Rsvp>, LedgerError> {
        Ok(
            sqlx::query_as::<_, Rsvp>("SELECT * FROM event_rsvps WHERE id = $1")
                .bind(rsvp_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Live reservations for an event: GOING first, then WAITLIST in queue order.
    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Rsvp>, LedgerError> {
        Ok(sqlx::query_as::<_, Rsvp>(
            r"
            SELECT * FROM event_rsvps
            WHERE event_id = $1 AND status <> 'cancelled'
            ORDER BY CASE status WHEN 'going' THEN 0 ELSE 1 END, requested_at, seq
            ",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn going_count(&self, event_id: Uuid) -> Result<i64, LedgerError> {
        Ok(
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM event_rsvps WHERE event_id = $1 AND status = 'going'",
            )
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?,
        )
    }

    /// Run `attempt` until it succeeds, fails permanently, or retries run out.
    async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let max_attempts = self.settings.max_attempts.max(1);

        for n in 1..=max_attempts {
            let err = match tokio::time::timeout(self.settings.attempt_timeout, attempt()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) if err.is_retryable() => err,
                Ok(Err(err)) => return Err(err),
                Err(_) => {
                    warn!(operation, attempt = n, "Ledger attempt timed out");
                    return Err(LedgerError::TransientConflict);
                }
            };

            if n == max_attempts {
                warn!(operation, attempts = n, error = %err, "Ledger retries exhausted");
                break;
            }

            let jitter_ms = rand::thread_rng().gen_range(0..=self.settings.backoff_base_ms());
            let delay = self.settings.backoff(n, Duration::from_millis(jitter_ms));
            debug!(operation, attempt = n, ?delay, "Retrying after serialization conflict");
            tokio::time::sleep(delay).await;
        }

        Err(LedgerError::TransientConflict)
    }
}

async fn begin_serializable(pool: &PgPool) -> Result<Transaction<'static, Postgres>, LedgerError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;
    sqlx::query("LOCK TABLE event_rsvps IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

/// Capacity of an event, holding its row until commit.
async fn lock_event(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
) -> Result<Option<i32>, LedgerError> {
    Ok(
        sqlx::query_scalar("SELECT capacity FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut **tx)
            .await?,
    )
}

async fn count_going(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
) -> Result<i64, LedgerError> {
    Ok(sqlx::query_scalar(
        "SELECT COUNT(*) FROM event_rsvps WHERE event_id = $1 AND status = 'going'",
    )
    .bind(event_id)
    .fetch_one(&mut **tx)
    .await?)
}

async fn reserve_once(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    requested_at: DateTime<Utc>,
) -> Result<Rsvp, LedgerError> {
    let mut tx = begin_serializable(pool).await?;

    let capacity = lock_event(&mut tx, event_id)
        .await?
        .ok_or(LedgerError::EventNotFound)?;

    let already: bool = sqlx::query_scalar(
        r"
        SELECT EXISTS(
            SELECT 1 FROM event_rsvps
            WHERE event_id = $1 AND user_id = $2 AND status <> 'cancelled'
        )
        ",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    if already {
        return Err(LedgerError::DuplicateReservation);
    }

    let going = count_going(&mut tx, event_id).await?;
    let status = if going < i64::from(capacity) {
        RsvpStatus::Going
    } else {
        RsvpStatus::Waitlist
    };

    let rsvp = sqlx::query_as::<_, Rsvp>(
        r"
        INSERT INTO event_rsvps (id, event_id, user_id, status, requested_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(event_id)
    .bind(user_id)
    .bind(status)
    .bind(requested_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(rsvp)
}

async fn cancel_once(pool: &PgPool, rsvp_id: Uuid) -> Result<CancelOutcome, LedgerError> {
    let mut tx = begin_serializable(pool).await?;

    let current = sqlx::query_as::<_, Rsvp>("SELECT * FROM event_rsvps WHERE id = $1 FOR UPDATE")
        .bind(rsvp_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LedgerError::ReservationNotFound)?;

    if !current.status.is_live() {
        tx.commit().await?;
        return Ok(CancelOutcome {
            cancelled: current,
            promoted: None,
        });
    }

    let cancelled = sqlx::query_as::<_, Rsvp>(
        r"
        UPDATE event_rsvps SET status = 'cancelled', updated_at = NOW()
        WHERE id = $1
        RETURNING *
        ",
    )
    .bind(rsvp_id)
    .fetch_one(&mut *tx)
    .await?;

    let promoted = if current.status == RsvpStatus::Going {
        promote_next(&mut tx, current.event_id).await?
    } else {
        None
    };

    tx.commit().await?;
    Ok(CancelOutcome {
        cancelled,
        promoted,
    })
}

/// Move the oldest waitlisted reservation to GOING if a place is free.
async fn promote_next(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
) -> Result<Option<Rsvp>, LedgerError> {
    let capacity = lock_event(tx, event_id)
        .await?
        .ok_or(LedgerError::EventNotFound)?;
    let going = count_going(tx, event_id).await?;

    if going >= i64::from(capacity) {
        return Ok(None);
    }

    Ok(sqlx::query_as::<_, Rsvp>(
        r"
        UPDATE event_rsvps SET status = 'going', updated_at = NOW()
        WHERE id = (
            SELECT id FROM event_rsvps
            WHERE event_id = $1 AND status = 'waitlist'
            ORDER BY requested_at, seq
            LIMIT 1
        )
        RETURNING *
        ",
    )
    .bind(event_id)
    .fetch_optional(&mut **tx)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_sqlstates() {
        assert!(is_retryable_sqlstate("40001"));
        assert!(is_retryable_sqlstate("40P01"));
        assert!(!is_retryable_sqlstate("23505"));
        assert!(!is_retryable_sqlstate("23514"));
    }

    #[test]
    fn test_non_database_errors_are_not_retried() {
        assert!(!LedgerError::DuplicateReservation.is_retryable());
        assert!(!LedgerError::TransientConflict.is_retryable());
        assert!(!LedgerError::Database(sqlx::Error::RowNotFound).is_retryable());
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let settings = LedgerSettings {
            backoff_base: Duration::from_millis(20),
            ..LedgerSettings::default()
        };

        assert_eq!(settings.backoff(1, Duration::ZERO), Duration::from_millis(20));
        assert_eq!(settings.backoff(2, Duration::ZERO), Duration::from_millis(40));
        assert_eq!(settings.backoff(3, Duration::from_millis(5)), Duration::from_millis(85));
        // Exponent is capped
        assert_eq!(settings.backoff(50, Duration::ZERO), Duration::from_millis(20 * 64));
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default_for_test();
        config.rsvp_max_attempts = 0;
        config.rsvp_timeout_ms = 250;

        let settings = LedgerSettings::from_config(&config);
        assert_eq!(settings.max_attempts, 1);
        assert_eq!(settings.attempt_timeout, Duration::from_millis(250));
    }
}
