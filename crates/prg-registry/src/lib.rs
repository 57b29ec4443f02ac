pub mod enforce;
pub mod registry;

pub use enforce::*;
pub use registry::*;
