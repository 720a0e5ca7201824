use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use manufacturing_erp::{config, db, migrator::Migrator};

/// Schema migrations for the manufacturing database.
#[derive(Parser, Debug)]
#[command(name = "migration", version)]
struct Cli {
    /// Overrides the configured database URL.
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations (default).
    Up {
        #[arg(short = 'n', long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations, one step unless told otherwise.
    Down {
        #[arg(short = 'n', long, default_value_t = 1)]
        steps: u32,
    },
    /// Show which migrations have been applied.
    Status,
    /// Drop every table and reapply all migrations.
    Fresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    let conn = db::establish_connection_from_app_config(&cfg).await?;

    match cli.command.unwrap_or(Command::Up { steps: None }) {
        Command::Up { steps } => {
            info!("Starting database migration");
            Migrator::up(&conn, steps).await?;
            info!("Migration completed successfully");
        }
        Command::Down { steps } => {
            info!(steps, "Rolling back migrations");
            Migrator::down(&conn, Some(steps)).await?;
        }
        Command::Status => Migrator::status(&conn).await?,
        Command::Fresh => {
            info!("Dropping all tables and reapplying migrations");
            Migrator::fresh(&conn).await?;
        }
    }

    Ok(())
}
