use crate::cli::Cli;
use crate::clock::SystemClock;
use crate::debug;
use crate::settings::{Settings, SettingsStore, TimeWindow};
use crate::tracker::Tracker;
use crate::vault::{Entry, FsVault, ListenerId};
use anyhow::{Context, Result};
use std::rc::Rc;

/// process-lifetime root owning the vault, the tracker and the settings
pub struct App {
    pub vault: FsVault,
    pub tracker: Rc<Tracker<Entry>>,
    settings: Settings,
    store: SettingsStore,
    subscription: ListenerId,
}

impl App {
    /// load settings, open the vault and start recording renames
    pub fn init(cli: &Cli) -> Result<Self> {
        let store = match &cli.config {
            Some(path) => SettingsStore::new(path.clone()),
            None => SettingsStore::default_location()?,
        };
        let settings = store.load()?;
        debug!(
            "loaded settings from {}: time window {}s",
            store.path().display(),
            settings.time_window.secs()
        );

        // a command-line window applies to this session without being saved
        let window = match cli.time_window {
            Some(secs) => TimeWindow::new(secs).context("invalid --time-window")?,
            None => settings.time_window,
        };

        let vault = FsVault::open(&cli.vault)?;
        let tracker = Rc::new(Tracker::new(window, Box::new(SystemClock)));
        let subscription = vault.subscribe(tracker.clone());
        debug!("tracking renames in {}", vault.root().display());

        Ok(Self {
            vault,
            tracker,
            settings,
            store,
            subscription,
        })
    }

    /// change the time window and persist it
    pub fn set_time_window(&mut self, window: TimeWindow) -> Result<()> {
        self.tracker.set_time_window(window);
        if self.settings.time_window != window {
            self.settings.time_window = window;
            self.store
                .save(&self.settings)
                .context("failed to save settings")?;
        }
        Ok(())
    }

    /// stop recording and drop the history
    pub fn dispose(self) {
        self.vault.unsubscribe(self.subscription);
        self.tracker.clear();
        debug!("stopped tracking renames in {}", self.vault.root().display());
    }
}
