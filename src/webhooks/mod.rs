pub mod dispatcher;
pub mod github;

pub use dispatcher::{Dispatcher, Evaluation, Outcome, Stage};
