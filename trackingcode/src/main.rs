use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use tracing_subscriber::EnvFilter;
use trackingcode::handlers::{handle_colours, handle_referrers, handle_report, load_config};
use trackingcode_core::print_banner;

mod commands;

fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_logging(chosen_command.get_flag("verbose"));

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if let Err(e) = run(&chosen_command) {
        eprintln!("{} {}", "✗".red().bold(), e);
        for cause in e.chain().skip(1) {
            eprintln!("  caused by: {}", cause);
        }
        std::process::exit(1);
    }
}

fn run(chosen_command: &ArgMatches) -> anyhow::Result<()> {
    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return Ok(());
    }

    let config = load_config(chosen_command.get_one::<String>("config").map(String::as_str))?;

    match chosen_command.subcommand() {
        Some(("report", primary_command)) => handle_report(primary_command, &config),
        Some(("referrers", primary_command)) => handle_referrers(primary_command, &config),
        Some(("colours", primary_command)) => handle_colours(primary_command, &config),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

/// Logs go to stderr; `RUST_LOG` wins unless `--verbose` is given.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
