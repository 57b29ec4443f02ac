pub mod anchor;
pub mod failure;
pub mod hash;
pub mod ids;
pub mod redact;

pub use anchor::*;
pub use failure::*;
pub use hash::*;
pub use ids::*;
pub use redact::*;
