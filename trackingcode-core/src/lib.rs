pub mod config;
pub mod data;
pub mod error;
pub mod report;

use colored::Colorize;

pub use config::DashboardConfig;
pub use error::CoreError;

pub fn print_banner() {
    eprintln!(
        "{} {}",
        "trackingco.de".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
