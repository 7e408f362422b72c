// ==================== ABANDONED CONTAINER SWEEP ====================
// Job que marca como `lost` os containers ativos sem uso há LOST_AFTER_DAYS dias

use crate::{database::MongoDB, services::container_service};
use chrono::Utc;
use tokio::time::{interval, Duration};

const SWEEP_EVERY_SECS: u64 = 3600;

/// Timestamp before which an active container counts as abandoned.
pub fn cutoff(now: i64, lost_after_days: u32) -> i64 {
    now - i64::from(lost_after_days) * 86_400
}

/// Inicia o sweep em background (a cada hora, primeira execução imediata).
/// `lost_after_days == 0` desliga o job.
pub fn start_abandoned_sweep(db: MongoDB, lost_after_days: u32) {
    if lost_after_days == 0 {
        log::info!("🧭 Abandoned container sweep disabled (LOST_AFTER_DAYS=0)");
        return;
    }

    log::info!(
        "🧭 Starting abandoned container sweep (every hour, lost after {} days)",
        lost_after_days
    );

    tokio::spawn(async move {
        // O primeiro tick do interval dispara imediatamente
        let mut ticker = interval(Duration::from_secs(SWEEP_EVERY_SECS));

        loop {
            ticker.tick().await;

            let limit = cutoff(Utc::now().timestamp(), lost_after_days);
            match container_service::sweep_abandoned(&db, limit, lost_after_days).await {
                Ok(0) => log::debug!("⏰ Sweep: no abandoned containers"),
                Ok(moved) => log::info!("🧭 Sweep: {} container(s) marked as lost", moved),
                Err(e) => log::error!("❌ Abandoned container sweep failed: {}", e),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff() {
        assert_eq!(cutoff(1_000_000, 1), 1_000_000 - 86_400);
        assert_eq!(cutoff(1_000_000, 0), 1_000_000);
    }
}
