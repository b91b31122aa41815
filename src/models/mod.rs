mod store;

pub use store::{ArtifactStore, VersionInfo};
