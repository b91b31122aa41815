//! Entity feature table and the CSV loader that produces it.

mod loader;
mod table;

pub use loader::{CsvFeatureStore, FeatureStore};
pub use table::EntityTable;
