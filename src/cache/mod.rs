//! Module cache validity
//!
//! A module's cached artifact is usable when the artifact file exists and
//! the module's current source fingerprint equals the one recorded when
//! that artifact was built.
//!
//! # Lifecycle
//!
//! | Step | Where | Effect |
//! |------|-------|--------|
//! | open | session start | recorded fingerprints read once |
//! | probe | before rewrite | current fingerprint compared per module |
//! | record | after a rebuild | current fingerprint stored |
//! | persist | session end | store written to disk |

pub mod fingerprint;
pub mod store;

pub use fingerprint::{Fingerprint, FingerprintOracle};
pub use store::{CacheStore, FileCacheStore, MemoryCacheStore, CACHE_FILE};
