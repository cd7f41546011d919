pub mod config;
pub mod encoding;
pub mod errors;
pub mod logging;
pub mod persistence;
pub mod types;
pub mod utils;

pub use config::*;
pub use errors::*;
pub use persistence::*;
pub use types::*;
pub use utils::*;
