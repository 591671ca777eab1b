// Job lifecycle: creation, lookup, result caching and expiry.

pub mod store;

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::jobs::store::JobStore;

/// How often expired jobs are swept out of memory.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Runs `sweep_expired` every `every` for the life of the process.
pub fn spawn_sweeper(store: JobStore, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // first tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.sweep_expired();
            if removed > 0 {
                info!("Cleaned up {removed} expired jobs");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_on_schedule() {
        let store = JobStore::with_ttl(chrono::Duration::zero());
        let job = store.create_job("r".to_string(), "j".to_string(), None);
        // expiry is measured on the wall clock
        std::thread::sleep(Duration::from_millis(2));

        let sweeper = spawn_sweeper(store.clone(), SWEEP_INTERVAL);
        tokio::task::yield_now().await;
        assert_eq!(store.stats().size, 1);

        tokio::time::sleep(SWEEP_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(store.stats().size, 0);
        assert!(store.get_job(job.id).is_none());

        sweeper.abort();
    }
}
