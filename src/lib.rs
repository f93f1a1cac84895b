//! Modswap - dependency-graph cache substitution
//!
//! Replaces source dependencies on build modules with references to their
//! previously built artifacts whenever those artifacts are still valid, and
//! propagates the substituted modules' own declarations so the consuming
//! build still sees every transitive dependency.

pub mod builder;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod registry;
pub mod rewrite;
pub mod session;
pub mod ui;

pub use builder::{ArtifactBuilder, BuildQueue, BuildRequest};
pub use error::{ModswapError, ModswapResult};
pub use model::{ProjectModel, Workspace};
pub use session::{Session, SessionReport};
