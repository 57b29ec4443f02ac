pub mod bijectivity;
pub mod determinism;

pub use bijectivity::*;
pub use determinism::*;
