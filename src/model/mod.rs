pub mod maintainer;
pub mod policy;
pub mod types;

pub use maintainer::{MaintainerSet, Person};
pub use policy::Policy;
pub use types::*;
