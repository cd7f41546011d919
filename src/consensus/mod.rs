pub mod certificate;
pub mod challenge;
pub mod criticality;
pub mod registry;

pub use certificate::*;
pub use challenge::*;
pub use criticality::*;
pub use registry::*;
