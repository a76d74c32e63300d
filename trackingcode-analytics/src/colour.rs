//! Stable, similarity-aware colours for referrers.
//!
//! The first referrer seen gets a random colour. Later referrers whose
//! identity is within a few edits of a cached one get a colour nudged from
//! it, so look-alike referrers end up looking alike on a chart.

use crate::error::{AnalyticsError, Result};
use crate::record::host_or_literal;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Hue, saturation and value, each in `[0, 1]`.
    pub fn to_hsv(&self) -> (f64, f64, f64) {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            ((g - b) / delta).rem_euclid(6.0) / 6.0
        } else if max == g {
            ((b - r) / delta + 2.0) / 6.0
        } else {
            ((r - g) / delta + 4.0) / 6.0
        };
        let s = if max == 0.0 { 0.0 } else { delta / max };

        (h, s, max)
    }

    pub fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        let h = (h.rem_euclid(1.0)) * 6.0;
        let s = s.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);

        let c = v * s;
        let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
        let m = v - c;

        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let channel = |value: f64| ((value + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::new(channel(r), channel(g), channel(b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = AnalyticsError;

    /// Accepts `#rrggbb` and `#rgb`, with or without the leading `#`.
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || AnalyticsError::InvalidColour(s.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        match hex.len() {
            6 => {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
                Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
            }
            3 => {
                let channel = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|n| n * 17)
                        .map_err(|_| invalid())
                };
                Ok(Self::new(channel(0)?, channel(1)?, channel(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reflect a channel that drifted outside `[0, 1]` back into range.
pub fn mirror(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    if value > 1.0 {
        1.0 - value % 1.0
    } else if value < 0.0 {
        ((value + 1000.0).rem_euclid(1.0)).clamp(0.0, 1.0)
    } else {
        value
    }
}

/// Levenshtein edit distance between two strings.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            curr[j] = if a[i - 1] == b[j - 1] {
                prev[j - 1]
            } else {
                1 + prev[j - 1].min(prev[j]).min(curr[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Identity a referrer is cached under: its host, or the raw string.
pub fn identity_of(referrer: &str) -> String {
    host_or_literal(referrer)
}

/// Edit-distance cut-offs for colour synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColourThresholds {
    /// Stop scanning the cache once a match this close is found.
    pub near: usize,
    /// Beyond this distance a referrer gets an unrelated colour.
    pub far: usize,
}

impl Default for ColourThresholds {
    fn default() -> Self {
        Self { near: 3, far: 7 }
    }
}

pub struct ColourAssignor<R: Rng = StdRng> {
    identities: Vec<String>,
    colours: HashMap<String, Rgb>,
    thresholds: ColourThresholds,
    rng: R,
}

impl ColourAssignor<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible assignor, mostly for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for ColourAssignor<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ColourAssignor<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            identities: Vec::new(),
            colours: HashMap::new(),
            thresholds: ColourThresholds::default(),
            rng,
        }
    }

    pub fn with_thresholds(mut self, thresholds: ColourThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> ColourThresholds {
        self.thresholds
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Cached colour for `referrer`, without assigning one.
    pub fn cached(&self, referrer: &str) -> Option<Rgb> {
        self.colours.get(&identity_of(referrer)).copied()
    }

    /// Forget every assignment.
    pub fn reset(&mut self) {
        self.identities.clear();
        self.colours.clear();
    }

    pub fn colour_for(&mut self, referrer: &str) -> Rgb {
        let identity = identity_of(referrer);
        if let Some(colour) = self.colours.get(&identity) {
            return *colour;
        }

        let colour = match self.nearest(&identity) {
            Some((nearest, distance)) if distance <= self.thresholds.far => {
                let base = self.colours[&nearest];
                let colour = self.near(base, distance);
                debug!(
                    "Colour for {} nudged from {} (distance {}): {}",
                    identity, nearest, distance, colour
                );
                colour
            }
            _ => {
                let colour = self.random_colour();
                debug!("Fresh colour for {}: {}", identity, colour);
                colour
            }
        };

        self.identities.push(identity.clone());
        self.colours.insert(identity, colour);
        colour
    }

    fn nearest(&self, identity: &str) -> Option<(String, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for cached in &self.identities {
            let distance = levenshtein(identity, cached);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((cached, distance));
            }
            if distance < self.thresholds.near {
                break;
            }
        }
        best.map(|(id, d)| (id.to_string(), d))
    }

    fn near(&mut self, base: Rgb, distance: usize) -> Rgb {
        let (h, s, v) = base.to_hsv();
        let dist = distance as f64 / 10.0;

        let h = h + self.rng.r#gen::<f64>() / 30.0 + dist;
        let s = self.push_away_from_middle(s, dist);
        let v = self.push_away_from_middle(v, dist);

        Rgb::from_hsv(mirror(h), mirror(s), mirror(v))
    }

    fn push_away_from_middle(&mut self, channel: f64, dist: f64) -> f64 {
        let step = self.rng.r#gen::<f64>() / 10.0 + dist;
        if channel > 0.5 {
            channel - step
        } else {
            channel + step
        }
    }

    fn random_colour(&mut self) -> Rgb {
        let h = self.rng.r#gen::<f64>();
        let s = self.rng.gen_range(0.45..=0.95);
        let v = self.rng.gen_range(0.55..=0.95);
        Rgb::from_hsv(h, s, v)
    }
}

/// A [`ColourAssignor`] shared between threads. Lookup, scan and insert
/// happen under a single lock.
#[derive(Clone)]
pub struct SharedColourAssignor {
    inner: Arc<Mutex<ColourAssignor>>,
}

impl SharedColourAssignor {
    pub fn new(assignor: ColourAssignor) -> Self {
        Self {
            inner: Arc::new(Mutex::new(assignor)),
        }
    }

    pub fn colour_for(&self, referrer: &str) -> Rgb {
        let mut assignor = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        assignor.colour_for(referrer)
    }

    pub fn reset(&self) {
        let mut assignor = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        assignor.reset();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
