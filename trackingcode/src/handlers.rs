use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::ArgMatches;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;
use trackingcode_analytics::Rgb;
use trackingcode_analytics::colour::{ColourAssignor, identity_of};
use trackingcode_core::config::{self, DashboardConfig};
use trackingcode_core::data::SiteSnapshot;
use trackingcode_core::report::{ReportFormat, ReportOptions, SiteReport, render, save_report};

/// Load the dashboard config, falling back to defaults when no file exists
/// at the default location.
pub fn load_config(path: Option<&str>) -> Result<DashboardConfig> {
    config::load(path).with_context(|| match path {
        Some(path) => format!("Failed to load config from {}", path),
        None => format!("Failed to load config from {}", config::DEFAULT_CONFIG_PATH),
    })
}

pub fn load_snapshot(path: &Path) -> Result<SiteSnapshot> {
    SiteSnapshot::load(path)
        .with_context(|| format!("Failed to read site snapshot {}", path.display()))
}

pub fn parse_start_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
}

pub fn report_options(
    config: &DashboardConfig,
    days: Option<u32>,
    start: Option<NaiveDate>,
    drill: Vec<String>,
    expanded: bool,
) -> ReportOptions {
    ReportOptions {
        start,
        top_n: config.display.top_n,
        expanded_pages: expanded,
        expanded_referrers: expanded,
        drill,
        ..ReportOptions::for_days(days.unwrap_or(config.display.window_days))
    }
}

pub fn colour_assignor(config: &DashboardConfig, seed: Option<u64>) -> ColourAssignor {
    let assignor = match seed {
        Some(seed) => ColourAssignor::with_seed(seed),
        None => ColourAssignor::new(),
    };
    assignor.with_thresholds(config.colours.thresholds())
}

pub fn build_report(
    snapshot: &SiteSnapshot,
    options: &ReportOptions,
    config: &DashboardConfig,
    seed: Option<u64>,
) -> Result<SiteReport> {
    let chart = config.chart_colours()?;
    let mut colours = colour_assignor(config, seed);
    Ok(SiteReport::build(snapshot, options, chart, &mut colours))
}

fn swatch(colour: Rgb) -> String {
    "  ".on_truecolor(colour.r, colour.g, colour.b).to_string()
}

/// The current referrer level as terminal lines, one per row.
pub fn referrer_listing(report: &SiteReport) -> String {
    let mut out = String::new();
    if report.referrer_path.is_empty() {
        out.push_str(&format!("{}\n", "Referrers".bold()));
    } else {
        out.push_str(&format!(
            "{} {}\n",
            "Referrers ›".bold(),
            report.referrer_path.join(" › ").bright_white()
        ));
    }

    if report.referrers.is_empty() {
        out.push_str("  (no referrers in this window)\n");
        return out;
    }

    for line in &report.referrers {
        let marker = if line.drillable { "+" } else { " " };
        out.push_str(&format!(
            "{} {} {:>8}  {}",
            swatch(line.colour),
            marker.cyan(),
            line.own_count,
            line.key
        ));
        if line.drillable {
            out.push_str(&format!("  ↦ {}", line.deep_count));
        }
        if let Some(ref link) = line.link {
            out.push_str(&format!("  {}", link.bright_black()));
        }
        out.push('\n');
    }

    if report.referrers_has_more {
        out.push_str(&format!("  {}\n", "... more (use --expanded)".bright_black()));
    }
    if report.can_drill_up {
        out.push_str(&format!(
            "  {}\n",
            "drop the last --drill to go back up".bright_black()
        ));
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColourLine {
    pub referrer: String,
    pub identity: String,
    pub colour: Rgb,
}

/// Colours for `referrers`, assigned in the given order.
pub fn colour_lines(referrers: &[String], assignor: &mut ColourAssignor) -> Vec<ColourLine> {
    referrers
        .iter()
        .map(|referrer| ColourLine {
            referrer: referrer.clone(),
            identity: identity_of(referrer),
            colour: assignor.colour_for(referrer),
        })
        .collect()
}

fn options_from_args(args: &ArgMatches, config: &DashboardConfig) -> ReportOptions {
    let drill = args
        .get_many::<String>("drill")
        .map(|keys| keys.cloned().collect())
        .unwrap_or_default();
    report_options(
        config,
        args.get_one::<u32>("days").copied(),
        args.get_one::<NaiveDate>("start").copied(),
        drill,
        args.get_flag("expanded"),
    )
}

fn snapshot_from_args(args: &ArgMatches) -> Result<SiteSnapshot> {
    let input = args
        .get_one::<PathBuf>("input")
        .ok_or_else(|| anyhow!("--input is required"))?;
    load_snapshot(input)
}

pub fn handle_report(args: &ArgMatches, config: &DashboardConfig) -> Result<()> {
    let format_name = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let format = ReportFormat::from_str(format_name)
        .ok_or_else(|| anyhow!("Unknown report format: {}", format_name))?;

    let snapshot = snapshot_from_args(args)?;
    let options = options_from_args(args, config);
    let report = build_report(&snapshot, &options, config, args.get_one::<u64>("seed").copied())?;
    let content = render(&report, format).context("Failed to render report")?;

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            save_report(&content, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Saved {:?} report for {} to {}", format, report.domain, path.display());
            if !args.get_flag("quiet") {
                eprintln!(
                    "{} Report saved to {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                );
            }
        }
        None => print!("{}", content),
    }
    Ok(())
}

pub fn handle_referrers(args: &ArgMatches, config: &DashboardConfig) -> Result<()> {
    let snapshot = snapshot_from_args(args)?;
    let options = options_from_args(args, config);
    let report = build_report(&snapshot, &options, config, args.get_one::<u64>("seed").copied())?;
    print!("{}", referrer_listing(&report));
    Ok(())
}

pub fn handle_colours(args: &ArgMatches, config: &DashboardConfig) -> Result<()> {
    let referrers: Vec<String> = args
        .get_many::<String>("REFERRER")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let mut assignor = colour_assignor(config, args.get_one::<u64>("seed").copied());

    for line in colour_lines(&referrers, &mut assignor) {
        println!(
            "{} {}  {:<28} {}",
            swatch(line.colour),
            line.colour.to_hex(),
            line.identity,
            line.referrer.bright_black()
        );
    }
    Ok(())
}
