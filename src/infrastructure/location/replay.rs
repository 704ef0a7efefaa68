//! Track replay provider
//!
//! Plays back a recorded track as if it were a live provider. The track is a
//! JSON-lines file with one fix per line in the provider's own shape:
//!
//! ```text
//! {"timestamp":1429996400000,"coords":{"latitude":54.4,"longitude":-1.23,"altitude":0,"accuracy":10}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Replayed fixes are
//! stamped with the time they are emitted so the peer sees live times. A line
//! that does not parse is reported through the error callback and replay
//! carries on with the next one.
//!
//! Fixes are paced by the replay interval alone. The acquisition policy in
//! [`WatchOptions`] has nothing to act on for a recorded track and is ignored.

use crate::domain::models::{LocationError, LocationErrorKind, PositionSample};
use crate::domain::settings::LocationSettings;
use crate::infrastructure::location::provider::{
    ErrorCallback, FixCallback, LocationProvider, ProviderError, WatchId, WatchOptions,
};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct ReplayProvider {
    path: PathBuf,
    interval: Duration,
    repeat: bool,
    next_id: u32,
    tasks: HashMap<WatchId, JoinHandle<()>>,
}

impl ReplayProvider {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            repeat: false,
            next_id: 0,
            tasks: HashMap::new(),
        }
    }

    /// Restart from the top when the track runs out.
    pub fn looping(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn from_settings(settings: &LocationSettings) -> Result<Self, ProviderError> {
        let path = settings
            .replay_path
            .clone()
            .ok_or_else(|| ProviderError::Unavailable("no replay track configured".into()))?;
        Ok(Self::new(path, Duration::from_millis(settings.replay_interval_ms))
            .looping(settings.replay_loop))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Watches whose replay is still running.
    pub fn active_watches(&self) -> usize {
        self.tasks.values().filter(|t| !t.is_finished()).count()
    }
}

impl LocationProvider for ReplayProvider {
    fn watch(
        &mut self,
        on_fix: FixCallback,
        on_error: ErrorCallback,
        _options: WatchOptions,
    ) -> Result<WatchId, ProviderError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        self.tasks.retain(|_, task| !task.is_finished());
        self.next_id += 1;
        let id = WatchId(self.next_id);

        info!(
            "Replaying {} every {:?} (watch {})",
            self.path.display(),
            self.interval,
            id.0
        );
        let task = runtime.spawn(replay_track(
            self.path.clone(),
            self.interval,
            self.repeat,
            on_fix,
            on_error,
        ));
        self.tasks.insert(id, task);
        Ok(id)
    }

    fn unwatch(&mut self, id: WatchId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }
}

impl Drop for ReplayProvider {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

async fn replay_track(
    path: PathBuf,
    interval: Duration,
    repeat: bool,
    mut on_fix: FixCallback,
    mut on_error: ErrorCallback,
) {
    loop {
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) => {
                on_error(LocationError::new(
                    LocationErrorKind::PositionUnavailable,
                    format!("cannot read {}: {}", path.display(), e),
                ));
                return;
            }
        };

        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match serde_json::from_str::<PositionSample>(line) {
                Ok(mut sample) => {
                    sample.timestamp = Utc::now().timestamp_millis();
                    on_fix(sample);
                }
                Err(e) => on_error(LocationError::new(
                    LocationErrorKind::PositionUnavailable,
                    format!("{} line {}: {}", path.display(), index + 1, e),
                )),
            }
            tokio::time::sleep(interval).await;
        }

        if !repeat {
            debug!("Replay of {} finished", path.display());
            return;
        }
        // Also paces re-reads of a track with no entries
        tokio::time::sleep(interval).await;
    }
}
