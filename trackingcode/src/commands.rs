use crate::CLAP_STYLING;
use clap::{Arg, arg, command};
use std::path::PathBuf;
use trackingcode::handlers::parse_start_date;

fn input_arg() -> Arg {
    arg!(-i --"input" <SNAPSHOT>)
        .required(true)
        .help("Path to a site snapshot (JSON) as served by the backend")
        .value_parser(clap::value_parser!(PathBuf))
}

fn days_arg() -> Arg {
    arg!(--"days" <DAYS>)
        .required(false)
        .help("Days of traffic to cover; charted by month past 90 (default: from config)")
        .value_parser(clap::value_parser!(u32).range(1..))
}

fn start_arg() -> Arg {
    arg!(--"start" <DATE>)
        .required(false)
        .help("The series ends the day (or month) before this date, YYYY-MM-DD (default: today)")
        .value_parser(parse_start_date)
}

fn drill_arg() -> Arg {
    arg!(--"drill" <KEY>)
        .required(false)
        .help("Referrer key to drill into; repeat to go deeper")
        .action(clap::ArgAction::Append)
}

fn expanded_arg() -> Arg {
    arg!(--"expanded")
        .required(false)
        .help("Show every page and referrer instead of the top rows")
        .action(clap::ArgAction::SetTrue)
}

fn seed_arg() -> Arg {
    arg!(--"seed" <SEED>)
        .required(false)
        .help("Seed for referrer colours, for reproducible output")
        .value_parser(clap::value_parser!(u64))
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("trackingcode")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("trackingcode")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log decisions at debug level")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .help("Path to the config file (default: ~/.config/trackingcode/config.toml)")
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("report")
                .about("Render a full site report: traffic, pages, referrers and sessions")
                .arg(input_arg())
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv, markdown")
                        .value_parser(["text", "json", "csv", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(days_arg())
                .arg(start_arg())
                .arg(drill_arg())
                .arg(expanded_arg())
                .arg(seed_arg()),
        )
        .subcommand(
            command!("referrers")
                .about("Show one level of the referrer tree")
                .arg(input_arg())
                .arg(days_arg())
                .arg(start_arg())
                .arg(drill_arg())
                .arg(expanded_arg())
                .arg(seed_arg()),
        )
        .subcommand(
            command!("colours")
                .about("Show the colour each referrer would be drawn with")
                .arg(seed_arg())
                .arg(arg!(<REFERRER> ... "Referrer addresses, in display order")),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_report_arguments() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "trackingcode",
                "report",
                "-i",
                "site.json",
                "--drill",
                "a.com",
                "--drill",
                "x",
                "--days",
                "120",
                "--start",
                "2024-03-10",
                "-q",
            ])
            .unwrap();
        assert!(matches.get_flag("quiet"));

        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "report");
        assert_eq!(sub.get_one::<String>("format").unwrap(), "text");
        assert_eq!(sub.get_one::<u32>("days"), Some(&120));
        let drill: Vec<_> = sub.get_many::<String>("drill").unwrap().collect();
        assert_eq!(drill, vec!["a.com", "x"]);
        assert_eq!(
            sub.get_one::<chrono::NaiveDate>("start").copied(),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 10)
        );
    }

    #[test]
    fn test_rejects_zero_days() {
        let result = command_argument_builder().try_get_matches_from([
            "trackingcode",
            "referrers",
            "-i",
            "site.json",
            "--days",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_colours_needs_a_referrer() {
        let result = command_argument_builder().try_get_matches_from(["trackingcode", "colours"]);
        assert!(result.is_err());
    }
}
