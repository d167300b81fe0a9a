//! Schema maintenance for a spendbook database.
//!
//! `migration [up|down|fresh|status] [database-url]`. Without a URL the
//! binary reads `SPENDBOOK_DATABASE_URL`, then `DATABASE_URL`, then falls
//! back to `./spendbook.db` next to the caller.

use std::str::FromStr;

use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_URL: &str = "sqlite:./spendbook.db?mode=rwc";
const USAGE: &str = "usage: migration [up|down|fresh|status] [database-url]";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Up,
    Down,
    Fresh,
    Status,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "up" => Ok(Action::Up),
            "down" => Ok(Action::Down),
            "fresh" => Ok(Action::Fresh),
            "status" => Ok(Action::Status),
            other => Err(format!("unknown action `{other}`")),
        }
    }
}

fn database_url(explicit: Option<String>) -> String {
    explicit
        .or_else(|| std::env::var("SPENDBOOK_DATABASE_URL").ok())
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_URL.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let action = match args.next().as_deref().unwrap_or("up").parse::<Action>() {
        Ok(action) => action,
        Err(err) => {
            eprintln!("{err}\n{USAGE}");
            std::process::exit(2);
        }
    };
    let url = database_url(args.next());

    let db = Database::connect(&url).await?;
    match action {
        Action::Up => migration::Migrator::up(&db, None).await?,
        // One step at a time; `fresh` is the way to wipe everything.
        Action::Down => migration::Migrator::down(&db, Some(1)).await?,
        Action::Fresh => migration::Migrator::fresh(&db).await?,
        Action::Status => migration::Migrator::status(&db).await?,
    }
    eprintln!("{action:?} applied to {url}");
    Ok(())
}
