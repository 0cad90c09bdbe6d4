//! Administration commands for the Axis Booking service.

use anyhow::{Context, Result};
use booking::{config::ConfigLoader, db, repositories::UserRepository, seeds, telemetry};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "manage", version, about = "Axis Booking administration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Create any missing default axis
    SeedAxes,
    /// Delete every reservation and axis, then recreate the default axes
    ResetAxes,
    /// Create or promote an administrator account and reset its password
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing telemetry")?;

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    match cli.command {
        Command::Migrate => {
            db::migrate(&db).await?;
            println!("Migrations applied");
        }
        Command::SeedAxes => {
            db::migrate(&db).await?;
            let created = seeds::seed_axes(&db).await?;
            println!("Created {created} axes");
        }
        Command::ResetAxes => {
            db::migrate(&db).await?;
            let created = seeds::reset_axes(&db).await?;
            println!("Reset complete, {created} axes created");
        }
        Command::CreateAdmin { email, password } => {
            db::migrate(&db).await?;
            let admin = UserRepository::new(&db)
                .upsert_admin(&email, &password)
                .await
                .context("creating admin account")?;
            println!("Administrator {} ({}) is active", admin.email, admin.id);
        }
    }

    Ok(())
}
