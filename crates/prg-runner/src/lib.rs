pub mod config;
pub mod orchestrator;
pub mod reporter;
pub mod state;
pub mod util;

pub use config::*;
pub use orchestrator::*;
pub use reporter::*;
pub use state::*;
pub use util::*;
