//! Settings for the command line front end.
//!
//! Sources, lowest priority first: the TOML file (`config/spendbook.toml`
//! unless `--config` says otherwise, optional), `SPENDBOOK_*` environment
//! variables with `__` between nested keys (`SPENDBOOK_APP__OWNER`), and
//! the global command line flags.

use chrono_tz::Tz;
use serde::Deserialize;

use crate::{
    cli::Cli,
    error::{AppError, Result},
};

const DEFAULT_CONFIG_PATH: &str = "config/spendbook.toml";
const DEFAULT_SQLITE_PATH: &str = "spendbook.db";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
    pub owner: String,
    pub timezone: String,
    pub currency_symbol: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            owner: String::new(),
            timezone: "UTC".to_string(),
            currency_symbol: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite(DEFAULT_SQLITE_PATH.to_string())
    }
}

impl Database {
    /// `memory` selects an in-memory database, anything else is a path.
    fn from_flag(value: &str) -> Self {
        match value.trim() {
            "memory" => Self::Memory,
            path => Self::Sqlite(path.to_string()),
        }
    }

    pub fn url(&self) -> String {
        match self {
            Self::Memory => String::from("sqlite::memory:"),
            Self::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
}

impl Settings {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SPENDBOOK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        let mut settings: Settings = settings.try_deserialize()?;

        if let Some(owner) = &cli.owner {
            settings.app.owner = owner.clone();
        }
        if let Some(timezone) = &cli.timezone {
            settings.app.timezone = timezone.clone();
        }
        if let Some(database) = &cli.database {
            settings.database = Database::from_flag(database);
        }

        Ok(settings)
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.app
            .timezone
            .parse::<Tz>()
            .map_err(|_| AppError::Usage(format!("unknown timezone: {}", self.app.timezone)))
    }

    pub fn owner(&self) -> Result<&str> {
        let owner = self.app.owner.trim();
        if owner.is_empty() {
            return Err(AppError::Usage(
                "no owner configured: set app.owner or pass --owner".to_string(),
            ));
        }
        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_flag() {
        assert_eq!(Database::from_flag("memory"), Database::Memory);
        assert_eq!(
            Database::from_flag("data/book.db"),
            Database::Sqlite("data/book.db".to_string())
        );
        assert_eq!(
            Database::from_flag("data/book.db").url(),
            "sqlite:data/book.db?mode=rwc"
        );
    }

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.timezone().unwrap(), Tz::UTC);
        assert!(settings.owner().is_err());
        assert_eq!(settings.database, Database::Sqlite("spendbook.db".to_string()));
    }

    #[test]
    fn bad_timezone_is_a_usage_error() {
        let mut settings = Settings::default();
        settings.app.timezone = "Mars/Olympus".to_string();
        assert!(matches!(settings.timezone(), Err(AppError::Usage(_))));
    }
}
