pub mod engine;

pub use engine::{ApprovalEngine, Verdict};
