//! infergate-core: request and pod data model, plugin identities and the
//! scheduler configuration file format.

pub mod config;
pub mod error;
pub mod types;

pub use config::SchedulingConfigFile;
pub use error::{CoreError, CoreResult};
pub use types::*;
