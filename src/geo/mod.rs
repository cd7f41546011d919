pub mod cell;
pub mod displacement;

pub use cell::*;
pub use displacement::*;
