mod config_cmd;
pub mod console;
mod plan;

use clap::ValueEnum;

pub use config_cmd::ConfigCommand;
pub use plan::PlanCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
