use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::api::PatrolState;
use crate::configurator::Configurator;
use crate::prom::PromError;
use crate::relabel::{LifecycleError, RuleLifecycle};

use super::detector::CardinalityDetector;

#[derive(Debug)]
enum PassError {
    Detect(PromError),
    Silence(LifecycleError),
}

impl std::fmt::Display for PassError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detect(e) => write!(f, "detection: {e}"),
            Self::Silence(e) => write!(f, "remediation: {e}"),
        }
    }
}

/// The long-lived patrol task: runs one detection-and-remediation pass per
/// tick, sequentially, forever. Missed ticks are coalesced rather than
/// queued, and per-pass errors never terminate the loop; the daemon only
/// stops when the shutdown signal fires.
pub struct PatrolLoop<SC, BC> {
    pub detector: CardinalityDetector,
    pub lifecycle: RuleLifecycle<SC, BC>,
    pub interval: Duration,
    pub max_consecutive_failures: u32,
    pub state: PatrolState,
}

impl<SC: Configurator, BC: Configurator> PatrolLoop<SC, BC> {
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    tracing::info!("patrol loop stopping");
                    return;
                }
            }

            self.state.increment_passes();

            let pass = async {
                let detected = self.detector.detect().await.map_err(PassError::Detect)?;
                for series in &detected {
                    self.lifecycle
                        .apply_silence(series)
                        .await
                        .map_err(PassError::Silence)?;
                    self.state.increment_rules_applied();
                }
                Ok::<usize, PassError>(detected.len())
            };

            // An in-flight pass is abandoned at its next await point on
            // shutdown.
            let outcome = tokio::select! {
                outcome = pass => outcome,
                _ = shutdown.changed() => {
                    tracing::info!("patrol loop stopping mid-pass");
                    return;
                }
            };

            match outcome {
                Ok(detected) => {
                    consecutive_failures = 0;
                    self.state.set_consecutive_failures(0);
                    if detected > 0 {
                        tracing::info!(detected, "patrol pass remediated exploding series");
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    self.state.increment_pass_failures();
                    self.state
                        .set_consecutive_failures(consecutive_failures as u64);
                    if consecutive_failures >= self.max_consecutive_failures {
                        tracing::error!(
                            error = %e,
                            consecutive_failures,
                            "patrol passes failing persistently"
                        );
                        consecutive_failures = 0;
                    } else {
                        tracing::warn!(error = %e, "patrol pass failed, continuing at next tick");
                    }
                }
            }
        }
    }
}
