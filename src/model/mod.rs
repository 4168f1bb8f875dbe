pub mod revision;
pub mod status;
pub mod project;
pub mod config;

pub use revision::*;
pub use status::*;
pub use project::*;
pub use config::*;
