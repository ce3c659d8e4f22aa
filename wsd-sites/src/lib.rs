//! Site features for the dashboard map.
//!
//! Geometry and static attributes belong to the site registry; this crate
//! only reads them and stamps each site's current value and status onto the
//! matching feature.

pub mod feature;
pub mod merge;

pub use feature::{Feature, FeatureCollection};
pub use merge::{merge_snapshots, MergeOutcome, SiteSnapshot, UnmatchedSite};
