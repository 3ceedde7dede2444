//! Forge operations the approval flow depends on.
//!
//! Every call acts on behalf of a stored [`User`], whose token authenticates
//! the request. Implementations own retries and timeouts.

use async_trait::async_trait;

use crate::database::models::{Repo, User};
use crate::error::LgtmError;
use crate::model::{Comment, Member, Perm, Review, Team};

/// Name of the commit status posted to pull requests.
pub const STATUS_CONTEXT: &str = "approvals/lgtm";

#[async_trait]
pub trait Remote: Send + Sync {
    async fn get_repo(&self, user: &User, owner: &str, name: &str) -> Result<Repo, LgtmError>;

    async fn get_perm(&self, user: &User, owner: &str, name: &str) -> Result<Perm, LgtmError>;

    /// Repositories the user can administer.
    async fn get_repos(&self, user: &User) -> Result<Vec<Repo>, LgtmError>;

    /// Organisations the user belongs to.
    async fn get_teams(&self, user: &User) -> Result<Vec<Team>, LgtmError>;

    /// Members of the `maintainers` team of `org`.
    async fn get_members(&self, user: &User, org: &str) -> Result<Vec<Member>, LgtmError>;

    async fn get_comments(
        &self,
        user: &User,
        repo: &Repo,
        number: u64,
    ) -> Result<Vec<Comment>, LgtmError>;

    async fn get_reviews(
        &self,
        user: &User,
        repo: &Repo,
        number: u64,
    ) -> Result<Vec<Review>, LgtmError>;

    async fn get_contents(&self, user: &User, repo: &Repo, path: &str)
        -> Result<Vec<u8>, LgtmError>;

    /// Post the approval status on the pull request's head commit.
    async fn set_status(
        &self,
        user: &User,
        repo: &Repo,
        number: u64,
        granted: usize,
        required: usize,
    ) -> Result<(), LgtmError>;

    async fn get_issue_labels(
        &self,
        user: &User,
        repo: &Repo,
        number: u64,
    ) -> Result<Vec<String>, LgtmError>;

    async fn add_issue_labels(
        &self,
        user: &User,
        repo: &Repo,
        number: u64,
        labels: &[String],
    ) -> Result<(), LgtmError>;

    async fn remove_issue_labels(
        &self,
        user: &User,
        repo: &Repo,
        number: u64,
        labels: &[String],
    ) -> Result<(), LgtmError>;

    /// Install the webhook at `link` and require [`STATUS_CONTEXT`] on the
    /// default branch.
    async fn set_hook(&self, user: &User, repo: &Repo, link: &str) -> Result<(), LgtmError>;

    /// Remove the webhook at `link` and drop [`STATUS_CONTEXT`] from the
    /// default branch's required checks.
    async fn del_hook(&self, user: &User, repo: &Repo, link: &str) -> Result<(), LgtmError>;
}
