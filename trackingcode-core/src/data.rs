use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use trackingcode_analytics::{DateBucket, Period, ReferrerRecord};

/// Headline numbers for a day or month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    /// Sessions.
    pub s: u64,
    /// Pageviews.
    pub v: u64,
    /// Bounces: sessions with a single pageview.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b: Option<u64>,
    /// Sum of session scores.
    pub c: u64,
}

/// Top referrers, pages and referrer scores for a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Compendium {
    pub r: HashMap<String, u64>,
    pub p: HashMap<String, u64>,
    pub z: HashMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionGroup {
    pub referrer: String,
    pub scores: Vec<u64>,
}

/// One bar of the sessions-by-referrer chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualSession {
    pub referrer: String,
    pub score: u64,
}

/// Everything the dashboard knows about one site, as fetched from the
/// backend. Month-level data carries its own compendium.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSnapshot {
    pub domain: String,
    pub today: Stats,
    pub days: Vec<DateBucket>,
    pub months: Vec<DateBucket>,
    pub compendium: Compendium,
    pub months_compendium: Option<Compendium>,
    pub sessions_by_referrer: Vec<SessionGroup>,
}

impl SiteSnapshot {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Compendium for `period`; month views fall back to the day compendium.
    pub fn compendium(&self, period: Period) -> &Compendium {
        match period {
            Period::Month => self.months_compendium.as_ref().unwrap_or(&self.compendium),
            Period::Day => &self.compendium,
        }
    }

    pub fn series(&self, period: Period) -> &[DateBucket] {
        match period {
            Period::Day => &self.days,
            Period::Month => &self.months,
        }
    }

    /// Referrer records for `period`, largest first.
    pub fn referrer_records(&self, period: Period) -> Vec<ReferrerRecord> {
        entry_list(&self.compendium(period).r)
            .into_iter()
            .map(|e| ReferrerRecord::new(e.address, e.count))
            .collect()
    }

    pub fn pages(&self, period: Period) -> Vec<Entry> {
        entry_list(&self.compendium(period).p)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub address: String,
    pub count: u64,
}

/// Flatten an `address -> count` map into a list sorted by count, largest
/// first. Equal counts are ordered by address.
pub fn entry_list(map: &HashMap<String, u64>) -> Vec<Entry> {
    let mut list: Vec<Entry> = map
        .iter()
        .map(|(address, &count)| Entry {
            address: address.clone(),
            count,
        })
        .collect();
    list.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.address.cmp(&b.address)));
    list
}

/// First `limit` items unless `expanded`, plus whether anything was cut.
pub fn truncate<T>(list: &[T], limit: usize, expanded: bool) -> (&[T], bool) {
    let has_more = list.len() > limit;
    if expanded || !has_more {
        (list, has_more)
    } else {
        (&list[..limit], has_more)
    }
}

/// One entry per session score, in group order.
pub fn individual_sessions(groups: &[SessionGroup]) -> Vec<IndividualSession> {
    groups
        .iter()
        .flat_map(|group| {
            group.scores.iter().map(|&score| IndividualSession {
                referrer: group.referrer.clone(),
                score,
            })
        })
        .collect()
}
