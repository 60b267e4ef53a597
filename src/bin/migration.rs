use anyhow::Context;
use clap::{Parser, Subcommand};
use omni_orders_api::{db, migrator::Migrator};
use sea_orm_migration::MigratorTrait;
use tracing::info;

const DEFAULT_DATABASE_URL: &str = "sqlite://omni_orders.db?mode=rwc";

#[derive(Parser)]
#[command(name = "migration", about = "Manage the Omni Orders database schema", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Database URL; defaults to APP__DATABASE_URL, then DATABASE_URL"
    )]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations
    Up {
        #[arg(long, help = "Number of migrations to apply; all when omitted")]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        #[arg(long, default_value_t = 1, help = "Number of migrations to roll back")]
        steps: u32,
    },
    /// Drop every table and re-apply all migrations
    Fresh,
    /// Show applied and pending migrations
    Status,
}

fn resolve_database_url(explicit: Option<String>) -> String {
    explicit
        .or_else(|| std::env::var("APP__DATABASE_URL").ok())
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let config = db::DbConfig {
        url: resolve_database_url(cli.database_url),
        max_connections: 2,
        ..Default::default()
    };

    let pool = db::establish_connection_with_config(&config)
        .await
        .context("failed to connect to the database")?;

    match cli.command {
        Command::Up { steps } => {
            Migrator::up(&pool, steps).await.context("migration failed")?;
            info!("Migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&pool, Some(steps))
                .await
                .context("rollback failed")?;
            info!(steps, "Migrations rolled back");
        }
        Command::Fresh => {
            Migrator::fresh(&pool).await.context("fresh migration failed")?;
            info!("Database recreated");
        }
        Command::Status => {
            Migrator::status(&pool).await.context("status check failed")?;
        }
    }

    Ok(())
}
