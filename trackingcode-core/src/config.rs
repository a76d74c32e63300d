//! Dashboard configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration:
//!
//! ```toml
//! [display]
//! top_n = 12
//! window_days = 45
//!
//! [colours]
//! near_threshold = 3
//! far_threshold = 7
//!
//! [chart]
//! bar1 = "#4791AE"
//! ```

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use trackingcode_analytics::{ColourThresholds, Rgb};

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/trackingcode/config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub display: DisplayConfig,
    pub colours: ColourConfig,
    pub chart: ChartColourOverrides,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Rows shown in the page and referrer tables before "see more".
    pub top_n: usize,
    /// Days covered when no window is given on the command line.
    pub window_days: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            top_n: 12,
            window_days: 45,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColourConfig {
    pub near_threshold: usize,
    pub far_threshold: usize,
}

impl Default for ColourConfig {
    fn default() -> Self {
        let thresholds = ColourThresholds::default();
        Self {
            near_threshold: thresholds.near,
            far_threshold: thresholds.far,
        }
    }
}

impl ColourConfig {
    pub fn thresholds(&self) -> ColourThresholds {
        ColourThresholds {
            near: self.near_threshold,
            far: self.far_threshold,
        }
    }
}

/// Partial chart palette; unset fields keep whatever was there before.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartColourOverrides {
    pub bar1: Option<String>,
    pub line1: Option<String>,
    pub background: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartColours {
    pub bar1: Rgb,
    pub line1: Rgb,
    pub background: Rgb,
}

impl Default for ChartColours {
    fn default() -> Self {
        Self {
            bar1: Rgb::new(0x47, 0x91, 0xae),
            line1: Rgb::new(0xea, 0x86, 0x76),
            background: Rgb::new(0xfd, 0xee, 0xcd),
        }
    }
}

impl ChartColours {
    /// Apply override sets in order, later sets winning.
    pub fn merge<'a, I>(mut self, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a ChartColourOverrides>,
    {
        for set in overrides {
            if let Some(ref bar1) = set.bar1 {
                self.bar1 = parse_colour("chart.bar1", bar1)?;
            }
            if let Some(ref line1) = set.line1 {
                self.line1 = parse_colour("chart.line1", line1)?;
            }
            if let Some(ref background) = set.background {
                self.background = parse_colour("chart.background", background)?;
            }
        }
        Ok(self)
    }
}

fn parse_colour(field: &str, value: &str) -> Result<Rgb> {
    value
        .parse()
        .map_err(|e| CoreError::InvalidConfig(format!("{}: {}", field, e)))
}

impl DashboardConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DashboardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.display.top_n == 0 {
            return Err(CoreError::InvalidConfig(
                "display.top_n must be at least 1".to_string(),
            ));
        }
        if self.colours.near_threshold > self.colours.far_threshold {
            return Err(CoreError::InvalidConfig(format!(
                "colours.near_threshold ({}) exceeds colours.far_threshold ({})",
                self.colours.near_threshold, self.colours.far_threshold
            )));
        }
        self.chart_colours().map(|_| ())
    }

    /// Default palette with this config's `[chart]` overrides applied.
    pub fn chart_colours(&self) -> Result<ChartColours> {
        ChartColours::default().merge([&self.chart])
    }
}

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Load the configuration.
///
/// An explicit `path` must exist. Without one the default location is
/// tried and silently skipped when absent.
pub fn load(path: Option<&str>) -> Result<DashboardConfig> {
    match path {
        Some(path) => load_file(&expand_path(path)),
        None => {
            let default = expand_path(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_file(&default)
            } else {
                debug!("No config at {}, using defaults", default.display());
                Ok(DashboardConfig::default())
            }
        }
    }
}

pub fn load_file(path: &Path) -> Result<DashboardConfig> {
    let content = fs::read_to_string(path)?;
    let config = DashboardConfig::from_toml_str(&content)?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}
