pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    ColourLine, build_report, colour_assignor, colour_lines, load_config, load_snapshot,
    parse_start_date, referrer_listing, report_options,
};
