/// Polling change detection and the live watch session.
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{ConfigError, SyncError};
use crate::scene::SceneHost;
use crate::snapshot::Snapshot;
use crate::sync::{import_or_update, SyncReport};

/// Holds the last snapshot that was synced.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    saved: Snapshot,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> &Snapshot {
        &self.saved
    }

    /// Capture `dir` and return the fresh snapshot if it differs from the
    /// saved one. The saved snapshot is left alone until [`Self::commit`].
    pub fn poll(&self, dir: &Path) -> Result<Option<Snapshot>, SyncError> {
        let fresh = Snapshot::capture(dir)?;
        Ok((fresh != self.saved).then_some(fresh))
    }

    pub fn commit(&mut self, snapshot: Snapshot) {
        self.saved = snapshot;
    }
}

/// Shared on/off switch for a watch session.
///
/// Clearing it stops the session at its next tick.
#[derive(Debug, Clone, Default)]
pub struct WatchToggle(Arc<AtomicBool>);

impl WatchToggle {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Running,
    Stopped,
}

/// Result of a single [`WatchSession::tick`].
#[derive(Debug)]
pub enum TickOutcome {
    /// Nothing changed since the last pass.
    Unchanged,
    /// A change was detected and a pass ran.
    Synced(SyncReport),
    /// The directory could not be read or the pass aborted; retried next tick.
    Unavailable(SyncError),
    /// The toggle is off; the session is over.
    Stopped,
}

/// A live watch over one folder.
pub struct WatchSession {
    settings: Settings,
    detector: ChangeDetector,
    toggle: WatchToggle,
    state: WatchState,
    resync: bool,
}

impl WatchSession {
    /// Start a session. The toggle begins in the state of
    /// `settings.live_watch`.
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let toggle = WatchToggle::new(settings.live_watch);
        info!(dir = %settings.watch_dir.display(), "watch session started");
        Ok(Self {
            settings,
            detector: ChangeDetector::new(),
            toggle,
            state: WatchState::Running,
            resync: false,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Handle for switching the session off from elsewhere.
    pub fn toggle(&self) -> WatchToggle {
        self.toggle.clone()
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// Make the next tick run a pass even if nothing changed.
    pub fn force_resync(&mut self) {
        self.resync = true;
    }

    /// Poll once and sync if the folder changed.
    pub fn tick<S: SceneHost + ?Sized>(&mut self, scene: &mut S) -> TickOutcome {
        if self.state == WatchState::Stopped {
            return TickOutcome::Stopped;
        }
        if !self.toggle.is_enabled() {
            self.state = WatchState::Stopped;
            self.detector = ChangeDetector::new();
            info!("watch session stopped");
            return TickOutcome::Stopped;
        }

        let dir = self.settings.watch_dir.as_path();
        let polled = if self.resync {
            Snapshot::capture(dir).map(Some)
        } else {
            self.detector.poll(dir)
        };
        let fresh = match polled {
            Ok(Some(fresh)) => fresh,
            Ok(None) => {
                debug!("no changes");
                return TickOutcome::Unchanged;
            }
            Err(error) => {
                warn!(%error, "watched directory unavailable");
                return TickOutcome::Unavailable(error);
            }
        };

        info!(files = fresh.len(), "change detected, updating scene");
        match import_or_update(scene, dir, &self.settings.transform()) {
            Ok(report) => {
                self.detector.commit(fresh);
                self.resync = false;
                TickOutcome::Synced(report)
            }
            Err(error) => {
                warn!(%error, "update pass aborted");
                TickOutcome::Unavailable(error)
            }
        }
    }

    /// Tick until the toggle is cleared, calling `sleep` with the poll
    /// interval between ticks. Returns the number of passes that ran.
    pub fn run<S, F>(&mut self, scene: &mut S, mut sleep: F) -> usize
    where
        S: SceneHost + ?Sized,
        F: FnMut(Duration),
    {
        let interval = self.settings.poll_interval();
        let mut passes = 0;
        loop {
            match self.tick(scene) {
                TickOutcome::Stopped => return passes,
                TickOutcome::Synced(_) => passes += 1,
                TickOutcome::Unchanged | TickOutcome::Unavailable(_) => {}
            }
            sleep(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryScene;
    use std::fs;
    use tempfile::TempDir;

    fn settings(dir: &Path) -> Settings {
        Settings {
            watch_dir: dir.to_path_buf(),
            live_watch: true,
            ..Settings::default()
        }
    }

    #[test]
    fn test_detector_commits_only_on_request() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        let mut detector = ChangeDetector::new();

        let fresh = detector.poll(temp.path()).unwrap().unwrap();
        assert!(detector.poll(temp.path()).unwrap().is_some());
        detector.commit(fresh);
        assert!(detector.poll(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_disabled_toggle_stops_on_first_tick() {
        let temp = TempDir::new().unwrap();
        let mut session = WatchSession::new(Settings {
            live_watch: false,
            ..settings(temp.path())
        })
        .unwrap();
        let mut scene = MemoryScene::new();

        assert!(matches!(session.tick(&mut scene), TickOutcome::Stopped));
        assert_eq!(session.state(), WatchState::Stopped);

        // Re-enabling does not revive a stopped session.
        session.toggle().set(true);
        assert!(matches!(session.tick(&mut scene), TickOutcome::Stopped));
    }

    #[test]
    fn test_unavailable_directory_keeps_running() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("later");
        let mut session = WatchSession::new(settings(&missing)).unwrap();
        let mut scene = MemoryScene::new();

        assert!(matches!(
            session.tick(&mut scene),
            TickOutcome::Unavailable(SyncError::PathUnavailable { .. })
        ));
        assert_eq!(session.state(), WatchState::Running);

        fs::create_dir(&missing).unwrap();
        fs::write(missing.join("notes.txt"), "x").unwrap();
        assert!(matches!(session.tick(&mut scene), TickOutcome::Synced(_)));
    }

    #[test]
    fn test_run_stops_when_toggle_cleared() {
        let temp = TempDir::new().unwrap();
        let mut session = WatchSession::new(settings(temp.path())).unwrap();
        let toggle = session.toggle();
        let mut scene = MemoryScene::new();

        let mut sleeps = Vec::new();
        let passes = session.run(&mut scene, |interval| {
            sleeps.push(interval);
            if sleeps.len() == 3 {
                toggle.set(false);
            }
        });

        assert_eq!(passes, 0);
        assert_eq!(sleeps, vec![Duration::from_secs(4); 3]);
        assert_eq!(session.state(), WatchState::Stopped);
    }

    #[test]
    fn test_force_resync_runs_a_pass() {
        let temp = TempDir::new().unwrap();
        let mut session = WatchSession::new(settings(temp.path())).unwrap();
        let mut scene = MemoryScene::new();

        assert!(matches!(session.tick(&mut scene), TickOutcome::Unchanged));
        session.force_resync();
        assert!(matches!(session.tick(&mut scene), TickOutcome::Synced(_)));
        assert!(session.detector().saved().is_empty());
        assert!(matches!(session.tick(&mut scene), TickOutcome::Unchanged));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let temp = TempDir::new().unwrap();
        let result = WatchSession::new(Settings {
            poll_interval_secs: 0,
            ..settings(temp.path())
        });
        assert!(matches!(result, Err(ConfigError::InvalidInterval)));
    }
}
