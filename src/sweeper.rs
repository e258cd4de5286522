//! Background sweeper that evicts expired short-lived records.
//!
//! Pending registrations and password-reset requests carry an `expires_at`
//! column; rows past that deadline are useless and must not accumulate.
//! The sweeper deletes them on a fixed interval and is supervised from main.

use sqlx::PgPool;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

const SWEEP_INTERVAL_SECONDS: u64 = 300;

pub struct Sweeper {
    pool: PgPool,
}

impl Sweeper {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the sweep loop forever. Errors bubble up so the supervisor in
    /// main can restart the task with backoff.
    pub async fn run(&self) -> Result<(), sqlx::Error> {
        info!(interval_seconds = SWEEP_INTERVAL_SECONDS, "sweeper started");
        loop {
            self.sweep_once().await?;
            sleep(Duration::from_secs(SWEEP_INTERVAL_SECONDS)).await;
        }
    }

    async fn sweep_once(&self) -> Result<(), sqlx::Error> {
        let registrations = sqlx::query(
            "DELETE FROM pending_registrations WHERE expires_at < NOW()",
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        let resets = sqlx::query("DELETE FROM password_resets WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();

        if registrations > 0 || resets > 0 {
            info!(registrations, resets, "evicted expired records");
        } else {
            debug!("sweep cycle found nothing to evict");
        }

        Ok(())
    }
}
