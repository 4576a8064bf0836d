use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{ConfigCommand, PlanCommand};
use config::Config;
use fitplan::client::{HttpResourceClient, HttpUploadClient};
use fitplan::models::{MealPlan, WorkoutPlan};
use fitplan::panel::{RefreshPolicy, ResourcePanel};
use fitplan::shell::Shell;

#[derive(Parser)]
#[command(name = "fitplan")]
#[command(version)]
#[command(about = "Manage meal plans and workout plans", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log requests and results to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage meal plans
    Mealplan(PlanCommand),

    /// Manage workout plans
    Workout(PlanCommand),

    /// Open the interactive console
    Console,

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays clean
    let default_filter = if cli.verbose { "fitplan=info" } else { "fitplan=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config)?;
    tracing::debug!("Using API at {}", config.api_url.value);

    let http = reqwest::Client::new();
    let uploads = HttpUploadClient::with_client(http.clone(), &config.upload_url.value);
    let user_id = config.user_id.value;

    match cli.command {
        Some(Commands::Mealplan(cmd)) => {
            let client = HttpResourceClient::<MealPlan>::with_client(http, &config.api_url.value);
            let mut panel = ResourcePanel::new(client, uploads, user_id, RefreshPolicy::Manual);
            cmd.run(&mut panel).await?;
        }
        Some(Commands::Workout(cmd)) => {
            let client =
                HttpResourceClient::<WorkoutPlan>::with_client(http, &config.api_url.value);
            let mut panel = ResourcePanel::new(client, uploads, user_id, RefreshPolicy::Manual);
            cmd.run(&mut panel).await?;
        }
        Some(Commands::Console) => {
            let refresh = config.refresh.value;
            let meals = ResourcePanel::new(
                HttpResourceClient::<MealPlan>::with_client(http.clone(), &config.api_url.value),
                uploads.clone(),
                user_id,
                refresh,
            );
            let workouts = ResourcePanel::new(
                HttpResourceClient::<WorkoutPlan>::with_client(http, &config.api_url.value),
                uploads,
                user_id,
                refresh,
            );
            let mut shell = Shell::new(meals, workouts);
            commands::console::run(&mut shell).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
