//! Auto-append loop
//!
//! Appends a batch on a fixed interval while the mode channel reads `Auto`.
//! The next delay is only armed after the previous cycle and its callback
//! return, so cycles never overlap.

use crate::config::AutoplayConfig;
use crate::error::Result;
use crate::session::{GraphSession, Mode};
use obsgraph_core::{GraphSnapshot, RandomSource};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoplaySettings {
    pub interval: Duration,
    pub batch_size: usize,
    pub max_cycles: Option<usize>,
}

impl From<&AutoplayConfig> for AutoplaySettings {
    fn from(config: &AutoplayConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            batch_size: config.batch_size,
            max_cycles: config.max_cycles,
        }
    }
}

impl Default for AutoplaySettings {
    fn default() -> Self {
        Self::from(&AutoplayConfig::default())
    }
}

/// Run append cycles until the mode leaves `Auto` or `max_cycles` is reached.
///
/// The session mode mirrors the channel on every tick. Returns the number of
/// completed cycles.
pub async fn run_autoplay<R, F>(
    session: &mut GraphSession<R>,
    mode: watch::Receiver<Mode>,
    settings: AutoplaySettings,
    mut on_snapshot: F,
) -> Result<usize>
where
    R: RandomSource,
    F: FnMut(&GraphSnapshot),
{
    info!(
        interval_ms = settings.interval.as_millis() as u64,
        batch_size = settings.batch_size,
        "auto-append started"
    );
    let mut cycles = 0usize;

    while still_auto(session, &mode) {
        if settings.max_cycles.is_some_and(|max| cycles >= max) {
            break;
        }

        tokio::time::sleep(settings.interval).await;
        if !still_auto(session, &mode) {
            break;
        }

        let snapshot = session.append(settings.batch_size)?;
        on_snapshot(snapshot);
        cycles += 1;
        debug!(cycle = cycles, "auto-append cycle finished");
    }

    info!(cycles, "auto-append stopped");
    Ok(cycles)
}

fn still_auto<R: RandomSource>(session: &mut GraphSession<R>, mode: &watch::Receiver<Mode>) -> bool {
    let current = *mode.borrow();
    session.set_mode(current);
    current == Mode::Auto
}
