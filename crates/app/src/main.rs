use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "bottega={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let poll = Duration::from_secs(settings.worker.poll_seconds);
    let database = settings.database.clone();

    tasks.spawn(async move {
        let db = match parse_database(&database).await {
            Ok(db) => db,
            Err(err) => {
                tracing::error!("failed to initialize database: {err}");
                return;
            }
        };

        let engine = engine::Engine::builder().database(db).build();

        if let Err(err) = engine.seed_payment_methods().await {
            tracing::error!("failed to seed payment methods: {err}");
            return;
        }

        tracing::info!("payment methods seeded, starting effects worker");
        engine.run_effects_worker(poll).await;
    });

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
