//! # Periodic Loops
//!
//! Each loop is its own task. A run always completes; the shutdown signal
//! is only observed while waiting for the next run.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::service::SyncService;

/// Start the state sync, unconfirmed sync, tx state repair and spentness
/// aging loops. The first state sync covers every partition.
pub fn spawn_loops(service: Arc<SyncService>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
    let config = service.config().clone();

    let state = Arc::clone(&service);
    let unconfirmed = Arc::clone(&service);
    let tx_state = Arc::clone(&service);
    let spent = service;

    vec![
        spawn_periodic("state sync", config.state_interval(), shutdown.clone(), move |first| {
            let service = Arc::clone(&state);
            async move {
                if let Err(e) = service.sync_state(first).await {
                    warn!("[bn-04] state sync failed: {}", e);
                }
            }
        }),
        spawn_periodic(
            "unconfirmed sync",
            config.unconfirmed_interval(),
            shutdown.clone(),
            move |_| {
                let service = Arc::clone(&unconfirmed);
                async move { service.sync_unconfirmed().await }
            },
        ),
        spawn_periodic("tx state", config.tx_state_interval(), shutdown.clone(), move |_| {
            let service = Arc::clone(&tx_state);
            async move {
                if let Err(e) = service.check_tx_state().await {
                    warn!("[bn-04] tx state check failed: {}", e);
                }
            }
        }),
        spawn_periodic("spentness", config.spent_interval(), shutdown, move |_| {
            let service = Arc::clone(&spent);
            async move {
                match service.age_spentness().await {
                    Ok(aged) => info!("[bn-04] aged {} spends", aged),
                    Err(e) => warn!("[bn-04] spentness aging failed: {}", e),
                }
            }
        }),
    ]
}

fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut(bool) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut first = true;
        while !*shutdown.borrow() {
            let run = Uuid::new_v4();
            info!("[bn-04] {} loop start run={}", name, run);
            job(first).await;
            info!("[bn-04] {} loop done run={}", name, run);
            first = false;

            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("[bn-04] {} loop stopped", name);
    })
}
