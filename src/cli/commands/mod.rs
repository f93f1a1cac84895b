//! CLI command implementations

pub mod config;
pub mod init;
pub mod plan;
pub mod record;
pub mod status;

pub use config::execute as config;
pub use init::execute as init;
pub use plan::execute as plan;
pub use record::execute as record;
pub use status::execute as status;
