//! Resolution of a repository's approval policy and maintainer set.
//!
//! The `.lgtm` file in the repository root overrides the service defaults.
//! Maintainers come from the `MAINTAINERS` file unless the policy ignores it,
//! in which case (or when the file is missing) the owner organisation's
//! `maintainers` team is used.

use tracing::{debug, warn};

use crate::cache::RemoteCache;
use crate::database::models::{Repo, User};
use crate::error::LgtmError;
use crate::github::remote::Remote;
use crate::model::{MaintainerSet, Policy};

pub const POLICY_FILE: &str = ".lgtm";
pub const MAINTAINERS_FILE: &str = "MAINTAINERS";

pub struct ConfigResolver<'a> {
    remote: &'a dyn Remote,
    cache: &'a RemoteCache,
    defaults: &'a Policy,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(remote: &'a dyn Remote, cache: &'a RemoteCache, defaults: &'a Policy) -> Self {
        Self {
            remote,
            cache,
            defaults,
        }
    }

    /// A missing or unreadable `.lgtm` yields the defaults; a malformed one
    /// is an error.
    pub async fn resolve_policy(&self, user: &User, repo: &Repo) -> Result<Policy, LgtmError> {
        match self.remote.get_contents(user, repo, POLICY_FILE).await {
            Ok(data) => Policy::parse(&data, self.defaults),
            Err(e) => {
                debug!("No {} file for {}, using defaults: {}", POLICY_FILE, repo.slug, e);
                Ok(self.defaults.clone())
            }
        }
    }

    pub async fn resolve_maintainers(
        &self,
        user: &User,
        repo: &Repo,
        policy: &Policy,
    ) -> Result<MaintainerSet, LgtmError> {
        if !policy.ignore_maintainers_file {
            match self.remote.get_contents(user, repo, MAINTAINERS_FILE).await {
                Ok(data) => return MaintainerSet::parse(&data),
                Err(e) => {
                    debug!(
                        "No {} file for {}, falling back to team: {}",
                        MAINTAINERS_FILE, repo.slug, e
                    );
                }
            }
        }

        match self.cache.get_members(self.remote, user, &repo.owner).await {
            Ok(members) => {
                let maintainers = MaintainerSet::from_members(&members);
                if maintainers.is_empty() {
                    warn!("Maintainers team for {} has no members", repo.owner);
                }
                Ok(maintainers)
            }
            Err(e) => Err(LgtmError::MaintainersError(format!(
                "Error getting repository maintainers for {}. {}",
                repo.slug, e
            ))),
        }
    }

    /// Policy first, since it decides where maintainers come from.
    pub async fn resolve(
        &self,
        user: &User,
        repo: &Repo,
    ) -> Result<(Policy, MaintainerSet), LgtmError> {
        let policy = self.resolve_policy(user, repo).await?;
        let maintainers = self.resolve_maintainers(user, repo, &policy).await?;
        Ok((policy, maintainers))
    }
}
