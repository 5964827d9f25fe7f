/// Terminal front end for the stlsync watch session
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    style::Stylize,
};
use std::io;
use std::time::{Duration, Instant};
use stlsync_core::{MemoryScene, Settings, SyncReport, TickOutcome, WatchSession, WatchToggle};
use tracing::info;

pub mod report;

pub use report::{print_report, OutputFormat};

/// Live watch over a folder, driving an in-memory scene
pub struct WatchApp {
    session: WatchSession,
    scene: MemoryScene,
    toggle: WatchToggle,
    format: OutputFormat,
    passes: usize,
}

impl WatchApp {
    pub fn new(mut settings: Settings, format: OutputFormat) -> Result<Self, stlsync_core::ConfigError> {
        settings.live_watch = true;
        let session = WatchSession::new(settings)?;
        let toggle = session.toggle();
        Ok(Self {
            session,
            scene: MemoryScene::new(),
            toggle,
            format,
            passes: 0,
        })
    }

    pub fn scene(&self) -> &MemoryScene {
        &self.scene
    }

    /// Tick until `q` is read from the terminal. Returns the number of
    /// update passes that ran.
    pub fn run(&mut self) -> io::Result<usize> {
        eprintln!(
            "{} {} (type {} and Enter to stop, {} to re-import)",
            "Watching".green().bold(),
            self.session.settings().watch_dir.display(),
            "q".bold(),
            "r".bold()
        );

        let interval = self.session.settings().poll_interval();
        loop {
            match self.session.tick(&mut self.scene) {
                TickOutcome::Stopped => break,
                TickOutcome::Synced(report) => self.on_synced(&report)?,
                TickOutcome::Unchanged | TickOutcome::Unavailable(_) => {}
            }
            self.wait(interval)?;
        }

        info!(passes = self.passes, "monitor stopped");
        Ok(self.passes)
    }

    fn on_synced(&mut self, report: &SyncReport) -> io::Result<()> {
        self.passes += 1;
        print_report(&mut io::stdout(), report, self.format)
    }

    /// Sleep until the next tick, watching the terminal for a stop key.
    fn wait(&mut self, interval: Duration) -> io::Result<()> {
        let deadline = Instant::now() + interval;
        while self.toggle.is_enabled() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if event::poll(remaining)? && self.handle_input()? {
                break;
            }
        }
        Ok(())
    }

    /// Returns true when the next tick should run right away.
    fn handle_input(&mut self) -> io::Result<bool> {
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            return Ok(false);
        };
        if kind != KeyEventKind::Press {
            return Ok(false);
        }
        match key_action(code) {
            Some(KeyAction::Stop) => {
                self.toggle.set(false);
                Ok(true)
            }
            Some(KeyAction::Resync) => {
                info!("manual refresh requested");
                self.session.force_resync();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// What a key asks the watch loop to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Stop,
    Resync,
}

// The terminal stays in line mode, where Esc arrives fused with the
// following Enter, so only printable keys are bound.
fn key_action(code: KeyCode) -> Option<KeyAction> {
    match code {
        KeyCode::Char('q') => Some(KeyAction::Stop),
        KeyCode::Char('r') => Some(KeyAction::Resync),
        _ => None,
    }
}
