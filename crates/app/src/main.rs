use clap::Parser;
use migration::{Migrator, MigratorTrait};

mod cli;
mod commands;
mod error;
mod settings;

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = cli::Cli::parse();
    let settings = settings::Settings::load(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "spendbook={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let context = commands::Context {
        store: connect(&settings.database).await?,
        owner: settings.owner()?.to_string(),
        tz: settings.timezone()?,
        symbol: settings.app.currency_symbol.clone(),
    };

    if let Err(err) = context.run(cli.command).await {
        tracing::error!("{err}");
        return Err(err);
    }
    Ok(())
}

async fn connect(config: &settings::Database) -> error::Result<engine::SqliteStore> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    tracing::debug!(url = %config.url(), "database ready");
    Ok(engine::SqliteStore::builder().database(database).build())
}
