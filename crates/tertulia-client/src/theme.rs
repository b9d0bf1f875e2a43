//! Light/dark preference, kept in the local settings table.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use tertulia_store::Database;

use crate::error::{ClientError, Result};

const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

pub struct ThemeContext {
    db: Arc<Mutex<Database>>,
    current: Mutex<Theme>,
}

impl ThemeContext {
    /// Load the stored preference.  Missing or unreadable values mean
    /// [`Theme::Light`].
    pub fn load(db: Arc<Mutex<Database>>) -> Result<Self> {
        let stored = {
            let guard = lock(&db)?;
            guard.get_setting(THEME_KEY)?
        };

        let theme = match stored {
            None => Theme::default(),
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring stored theme");
                Theme::default()
            }),
        };

        Ok(Self {
            db,
            current: Mutex::new(theme),
        })
    }

    pub fn current(&self) -> Theme {
        self.current.lock().map(|t| *t).unwrap_or_default()
    }

    pub fn set(&self, theme: Theme) -> Result<()> {
        lock(&self.db)?.set_setting(THEME_KEY, theme.as_str())?;
        let mut current = self
            .current
            .lock()
            .map_err(|e| ClientError::Settings(format!("Lock poisoned: {e}")))?;
        *current = theme;
        debug!(theme = %theme, "Theme saved");
        Ok(())
    }

    pub fn toggle(&self) -> Result<Theme> {
        let next = self.current().toggled();
        self.set(next)?;
        Ok(next)
    }
}

fn lock(db: &Mutex<Database>) -> Result<std::sync::MutexGuard<'_, Database>> {
    db.lock()
        .map_err(|e| ClientError::Settings(format!("Lock poisoned: {e}")))
}
