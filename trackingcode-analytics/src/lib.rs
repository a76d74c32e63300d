pub mod colour;
pub mod error;
pub mod record;
pub mod series;
pub mod trie;

pub use colour::{ColourAssignor, ColourThresholds, Rgb, SharedColourAssignor};
pub use error::AnalyticsError;
pub use record::{DIRECT, ReferrerRecord};
pub use series::{DateBucket, Period};
pub use trie::{LevelRow, LevelView, ReferrerExplorer, ReferrerTrie};
