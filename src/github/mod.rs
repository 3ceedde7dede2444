pub mod client;
pub mod protection;
pub mod remote;
pub mod types;
pub mod webhooks;

pub use client::GitHubClient;
pub use remote::{Remote, STATUS_CONTEXT};
pub use webhooks::{HookEvent, WebhookProcessor};
