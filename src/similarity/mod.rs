//! Nearest-speaker search over z-scored linguistic features.
//!
//! Statistics are recomputed from whatever table is passed in; nothing is
//! cached between queries.

mod engine;
mod normalize;

pub use engine::{find_similar, rank_similar, Recommendation};
