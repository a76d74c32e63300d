//! Day/month bucket series and the gap-fill that makes them contiguous.

use chrono::{Datelike, Days, Local, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const DATE_FORMAT: &str = "%Y%m%d";
pub const MONTH_FORMAT: &str = "%Y%m";

/// Windows longer than this many days are charted by month.
pub const MONTHS_AFTER_DAYS: u32 = 90;

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Month,
}

impl Period {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "day" | "days" => Some(Period::Day),
            "month" | "months" => Some(Period::Month),
            _ => None,
        }
    }

    /// Granularity used to chart the last `days` days.
    pub fn for_window(days: u32) -> Self {
        if days > MONTHS_AFTER_DAYS {
            Period::Month
        } else {
            Period::Day
        }
    }

    /// Field name the backend uses for this period's key.
    pub fn key_name(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Month => "month",
        }
    }

    pub fn encode(&self, date: NaiveDate) -> String {
        match self {
            Period::Day => date.format(DATE_FORMAT).to_string(),
            Period::Month => date.format(MONTH_FORMAT).to_string(),
        }
    }

    /// `20240310` -> `10/Mar/2024`, `202403` -> `Mar/2024`.
    pub fn format_key(&self, key: &str) -> Option<String> {
        let expected = match self {
            Period::Day => 8,
            Period::Month => 6,
        };
        if key.len() != expected || !key.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let month: usize = key[4..6].parse().ok()?;
        let abbr = MONTH_ABBR.get(month.checked_sub(1)?)?;
        match self {
            Period::Day => Some(format!("{}/{}/{}", &key[6..8], abbr, &key[0..4])),
            Period::Month => Some(format!("{}/{}", abbr, &key[0..4])),
        }
    }

    fn align(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Day => date,
            Period::Month => date.with_day(1).unwrap_or(date),
        }
    }

    fn back(&self, date: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self {
            Period::Day => date.checked_sub_days(Days::new(n as u64)),
            Period::Month => date.checked_sub_months(Months::new(n)),
        }
    }

    fn forward(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::Day => date.checked_add_days(Days::new(1)),
            Period::Month => date.checked_add_months(Months::new(1)),
        }
    }
}

/// One chart bucket: a date key plus whatever metrics the backend sent.
///
/// Accepts the backend's `day`/`month` field name for the key on input.
/// Fields that are not numbers (embedded compendiums, null counts) are
/// dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateBucket {
    #[serde(alias = "day", alias = "month")]
    pub key: String,
    #[serde(flatten, deserialize_with = "numeric_metrics")]
    pub metrics: BTreeMap<String, f64>,
}

fn numeric_metrics<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, value)| value.as_f64().map(|n| (name, n)))
        .collect())
}

impl DateBucket {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Metric value, zero when absent.
    pub fn metric(&self, name: &str) -> f64 {
        self.metrics.get(name).copied().unwrap_or(0.0)
    }

    pub fn is_placeholder(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Expand `rows` into exactly `offset` contiguous buckets covering the
/// periods before `start` (today when `None`), oldest first.
///
/// `rows` must be sorted ascending by key. Missing periods become
/// placeholder buckets carrying only their key.
pub fn fill(
    period: Period,
    rows: &[DateBucket],
    offset: usize,
    start: Option<NaiveDate>,
) -> Vec<DateBucket> {
    let start = period.align(start.unwrap_or_else(|| Local::now().date_naive()));
    let mut current = u32::try_from(offset)
        .ok()
        .and_then(|n| period.back(start, n));

    let mut filled = Vec::with_capacity(offset);
    let mut cursor = 0;
    let mut placeholders = 0;

    while filled.len() < offset {
        let Some(date) = current else {
            // calendar ran out; pad so the length contract still holds
            filled.push(DateBucket::new(String::new()));
            placeholders += 1;
            continue;
        };
        let key = period.encode(date);

        while let Some(row) = rows.get(cursor) {
            if row.key.as_str() >= key.as_str() {
                break;
            }
            debug!("Skipping {} row {} outside the fill window", period.key_name(), row.key);
            cursor += 1;
        }

        match rows.get(cursor) {
            Some(row) if row.key == key => {
                filled.push(row.clone());
                cursor += 1;
            }
            _ => {
                filled.push(DateBucket::new(key));
                placeholders += 1;
            }
        }

        current = period.forward(date);
    }

    debug!(
        "Filled {} {} buckets ({} placeholders)",
        offset,
        period.key_name(),
        placeholders
    );
    filled
}

pub fn fill_days(rows: &[DateBucket], offset: usize, start: Option<NaiveDate>) -> Vec<DateBucket> {
    fill(Period::Day, rows, offset, start)
}

pub fn fill_months(rows: &[DateBucket], offset: usize, start: Option<NaiveDate>) -> Vec<DateBucket> {
    fill(Period::Month, rows, offset, start)
}

pub fn encode_date(date: NaiveDate) -> String {
    Period::Day.encode(date)
}

pub fn encode_month(date: NaiveDate) -> String {
    Period::Month.encode(date)
}
