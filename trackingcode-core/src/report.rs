// Site report assembly and rendering

use crate::config::ChartColours;
use crate::data::{Entry, SiteSnapshot, Stats, individual_sessions, truncate};
use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};
use trackingcode_analytics::colour::ColourAssignor;
use trackingcode_analytics::series::fill;
use trackingcode_analytics::trie::DEFAULT_LIMIT;
use trackingcode_analytics::{DIRECT, DateBucket, Period, ReferrerExplorer, Rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

/// What a report should cover and how much of it to show.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub period: Period,
    /// Number of periods in the traffic series.
    pub window: usize,
    /// The series ends the period before this date; today when `None`.
    pub start: Option<NaiveDate>,
    pub top_n: usize,
    pub expanded_pages: bool,
    pub expanded_referrers: bool,
    /// Referrer keys to drill through, outermost first.
    pub drill: Vec<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::for_days(45)
    }
}

impl ReportOptions {
    /// Options covering the last `days` days, charted by month past 90 days.
    pub fn for_days(days: u32) -> Self {
        let period = Period::for_window(days);
        let window = match period {
            Period::Day => days as usize,
            Period::Month => days.div_ceil(30) as usize,
        };
        Self {
            period,
            window,
            start: None,
            top_n: DEFAULT_LIMIT,
            expanded_pages: false,
            expanded_referrers: false,
            drill: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferrerLine {
    pub key: String,
    pub own_count: u64,
    pub deep_count: u64,
    pub link: Option<String>,
    pub drillable: bool,
    pub colour: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionBar {
    pub referrer: String,
    pub score: u64,
    pub colour: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteReport {
    pub domain: String,
    pub period: Period,
    pub today: Stats,
    pub series: Vec<DateBucket>,
    pub pages: Vec<Entry>,
    pub pages_has_more: bool,
    pub referrer_path: Vec<String>,
    pub referrers: Vec<ReferrerLine>,
    pub referrers_has_more: bool,
    pub can_drill_up: bool,
    pub sessions: Vec<SessionBar>,
    pub chart: ChartColours,
}

impl SiteReport {
    pub fn build<R: Rng>(
        snapshot: &SiteSnapshot,
        options: &ReportOptions,
        chart: ChartColours,
        colours: &mut ColourAssignor<R>,
    ) -> Self {
        let period = options.period;
        let series = fill(period, snapshot.series(period), options.window, options.start);

        let all_pages = snapshot.pages(period);
        let (pages, pages_has_more) = truncate(&all_pages, options.top_n, options.expanded_pages);

        let mut explorer = ReferrerExplorer::new(snapshot.referrer_records(period));
        for key in &options.drill {
            if !explorer.drill_down(key) {
                warn!("Cannot drill into referrer {}, stopping at {:?}", key, explorer.path());
                break;
            }
        }
        let level = explorer.view(options.top_n, options.expanded_referrers);
        debug!(
            "Referrer level {:?}: {} rows shown, more: {}",
            level.path,
            level.rows.len(),
            level.has_more
        );

        let referrers = level
            .rows
            .iter()
            .map(|row| {
                let identity = row.representative_url.as_deref().unwrap_or(row.key.as_str());
                ReferrerLine {
                    key: row.key.clone(),
                    own_count: row.own_count,
                    deep_count: row.deep_count,
                    link: row.link().map(str::to_string),
                    drillable: row.drillable,
                    colour: colours.colour_for(identity),
                }
            })
            .collect();

        let sessions = individual_sessions(&snapshot.sessions_by_referrer)
            .into_iter()
            .map(|session| SessionBar {
                colour: colours.colour_for(&session.referrer),
                referrer: session.referrer,
                score: session.score,
            })
            .collect();

        SiteReport {
            domain: snapshot.domain.clone(),
            period,
            today: snapshot.today.clone(),
            series,
            pages: pages.to_vec(),
            pages_has_more,
            referrer_path: level.path,
            referrers,
            referrers_has_more: level.has_more,
            can_drill_up: level.can_drill_up,
            sessions,
            chart,
        }
    }

    fn series_label(&self, key: &str) -> String {
        self.period
            .format_key(key)
            .unwrap_or_else(|| key.to_string())
    }

    fn referrer_heading(&self) -> String {
        if self.referrer_path.is_empty() {
            "Referrers".to_string()
        } else {
            format!("Referrers › {}", self.referrer_path.join(" › "))
        }
    }

    fn total_sessions(&self) -> f64 {
        self.series.iter().map(|b| b.metric("s")).sum()
    }
}

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

fn section(report: &mut String, title: &str) {
    report.push_str(RULE);
    report.push('\n');
    report.push_str(title);
    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");
}

pub fn generate_text_report(data: &SiteReport) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!("                        {}\n", data.domain.to_uppercase()));
    report.push_str(RULE);
    report.push_str("\n\n");

    report.push_str(&format!("Pageviews today:  {}\n", data.today.v));
    match data.today.b {
        Some(b) => report.push_str(&format!("Bounces today:    {}\n", b)),
        None => report.push_str("Bounces today:    -\n"),
    }
    report.push_str(&format!("Sessions today:   {}\n", data.today.s));
    report.push_str(&format!(
        "Sessions in the last {} {}s: {}\n\n",
        data.series.len(),
        data.period.key_name(),
        data.total_sessions()
    ));

    section(&mut report, "TRAFFIC");
    for bucket in &data.series {
        report.push_str(&format!(
            "  {:<12} {:>8} sessions {:>8} pageviews\n",
            data.series_label(&bucket.key),
            bucket.metric("s"),
            bucket.metric("v")
        ));
    }
    report.push('\n');

    section(&mut report, "MOST VIEWED PAGES");
    if data.pages.is_empty() {
        report.push_str("  (none)\n");
    }
    for page in &data.pages {
        report.push_str(&format!("  {:>8}  {}\n", page.count, page.address));
    }
    if data.pages_has_more {
        report.push_str("  ... see more with --expanded\n");
    }
    report.push('\n');

    section(&mut report, &data.referrer_heading().to_uppercase());
    if data.referrers.is_empty() {
        report.push_str("  (none)\n");
    }
    for line in &data.referrers {
        let mut row = format!("  {} {:>8}  {}", line.colour, line.own_count, line.key);
        if line.drillable {
            row.push_str(&format!("  ↦ {}", line.deep_count));
        }
        if let Some(ref link) = line.link
            && line.key != DIRECT
        {
            row.push_str(&format!("  <{}>", link));
        }
        report.push_str(&row);
        report.push('\n');
    }
    if data.referrers_has_more {
        report.push_str("  ... see more with --expanded\n");
    }
    report.push('\n');

    if !data.sessions.is_empty() {
        section(&mut report, "SESSIONS BY REFERRER");
        for bar in &data.sessions {
            report.push_str(&format!("  {} {:>6}  {}\n", bar.colour, bar.score, bar.referrer));
        }
        report.push('\n');
    }

    report.push_str(RULE);
    report.push('\n');
    report
}

pub fn generate_json_report(data: &SiteReport) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "trackingcode",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "site": data
        }
    });

    serde_json::to_string_pretty(&json_report)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn generate_csv_report(data: &SiteReport) -> String {
    let mut report = String::from("section,key,count,deep_count,link,colour\n");

    for bucket in &data.series {
        report.push_str(&format!(
            "series,{},{},,,\n",
            csv_field(&bucket.key),
            bucket.metric("s")
        ));
    }
    for page in &data.pages {
        report.push_str(&format!("page,{},{},,,\n", csv_field(&page.address), page.count));
    }
    for line in &data.referrers {
        report.push_str(&format!(
            "referrer,{},{},{},{},{}\n",
            csv_field(&line.key),
            line.own_count,
            line.deep_count,
            csv_field(line.link.as_deref().unwrap_or("")),
            line.colour
        ));
    }
    for bar in &data.sessions {
        report.push_str(&format!(
            "session,{},{},,,{}\n",
            csv_field(&bar.referrer),
            bar.score,
            bar.colour
        ));
    }

    report
}

pub fn generate_markdown_report(data: &SiteReport) -> String {
    let mut report = String::new();

    report.push_str(&format!("# {}\n\n", data.domain));
    report.push_str("| Today | |\n|---|---|\n");
    report.push_str(&format!("| Pageviews | {} |\n", data.today.v));
    report.push_str(&format!(
        "| Bounces | {} |\n",
        data.today.b.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string())
    ));
    report.push_str(&format!("| Sessions | {} |\n\n", data.today.s));

    report.push_str("## Traffic\n\n| Date | Sessions | Pageviews |\n|---|---:|---:|\n");
    for bucket in &data.series {
        report.push_str(&format!(
            "| {} | {} | {} |\n",
            data.series_label(&bucket.key),
            bucket.metric("s"),
            bucket.metric("v")
        ));
    }

    report.push_str("\n## Most viewed pages\n\n| Page | Views |\n|---|---:|\n");
    for page in &data.pages {
        report.push_str(&format!("| `{}` | {} |\n", page.address, page.count));
    }
    if data.pages_has_more {
        report.push_str("\n_More pages not shown._\n");
    }

    report.push_str(&format!(
        "\n## {}\n\n| Referrer | Here | Deeper | Colour |\n|---|---:|---:|---|\n",
        data.referrer_heading()
    ));
    for line in &data.referrers {
        let name = match line.link {
            Some(ref link) if line.key != DIRECT => format!("[{}]({})", line.key, link),
            _ => line.key.clone(),
        };
        let deeper = if line.drillable {
            line.deep_count.to_string()
        } else {
            String::new()
        };
        report.push_str(&format!(
            "| {} | {} | {} | `{}` |\n",
            name, line.own_count, deeper, line.colour
        ));
    }
    if data.referrers_has_more {
        report.push_str("\n_More referrers not shown._\n");
    }

    report
}

pub fn render(data: &SiteReport, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(data)),
        ReportFormat::Json => generate_json_report(data),
        ReportFormat::Csv => Ok(generate_csv_report(data)),
        ReportFormat::Markdown => Ok(generate_markdown_report(data)),
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
