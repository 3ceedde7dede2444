//! Webhook Dispatcher
//!
//! Drives one classified delivery through identity lookup, policy and
//! maintainer resolution, evidence fetch, approval computation and
//! synchronization. Remote calls are issued one after another; a fatal error
//! at any stage ends the evaluation and is logged once, here.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::approval::{ApprovalEngine, Verdict};
use crate::cache::RemoteCache;
use crate::config::ConfigResolver;
use crate::database::models::{Repo, User};
use crate::database::Store;
use crate::enforcement::{self, SyncReport};
use crate::error::LgtmError;
use crate::github::remote::Remote;
use crate::github::webhooks::HookEvent;
use crate::model::{Hook, MaintainerSet, Person, Policy};

/// The last stage an evaluation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classified,
    ConfigResolved,
    MaintainersResolved,
    EvidenceFetched,
    Computed,
    Synchronized,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Classified => "classified",
            Stage::ConfigResolved => "config_resolved",
            Stage::MaintainersResolved => "maintainers_resolved",
            Stage::EvidenceFetched => "evidence_fetched",
            Stage::Computed => "computed",
            Stage::Synchronized => "synchronized",
            Stage::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// Body returned to the forge for an evaluated delivery.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub approvers: BTreeMap<String, Person>,
    pub settings: Policy,
    pub approved: bool,
    pub approved_by: Vec<Person>,
    #[serde(skip)]
    pub verdict: Verdict,
    #[serde(skip)]
    pub sync: SyncReport,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Ignored,
    Evaluated(Box<Evaluation>),
}

pub struct Dispatcher {
    remote: Arc<dyn Remote>,
    store: Arc<dyn Store>,
    cache: Arc<RemoteCache>,
    defaults: Policy,
}

impl Dispatcher {
    pub fn new(
        remote: Arc<dyn Remote>,
        store: Arc<dyn Store>,
        cache: Arc<RemoteCache>,
        defaults: Policy,
    ) -> Self {
        Self {
            remote,
            store,
            cache,
            defaults,
        }
    }

    pub async fn dispatch(&self, event: HookEvent) -> Result<Outcome, LgtmError> {
        let hook = match event {
            HookEvent::Irrelevant => return Ok(Outcome::Ignored),
            HookEvent::Comment(hook) | HookEvent::Review(hook) => hook,
        };

        let mut stage = Stage::Classified;
        match self.evaluate(&hook, &mut stage).await {
            Ok(evaluation) => Ok(Outcome::Evaluated(Box::new(evaluation))),
            Err(e) => {
                error!(
                    repo = %hook.repo.slug,
                    number = hook.issue.number,
                    last_stage = %stage,
                    "Evaluation failed: {}",
                    e
                );
                Err(e)
            }
        }
    }

    /// The stored repository and the user whose token acts on it.
    pub async fn lookup(&self, slug: &str) -> Result<(Repo, User), LgtmError> {
        let repo = self
            .store
            .get_repo_by_slug(slug)
            .await?
            .ok_or_else(LgtmError::repo_not_found)?;
        let user = self
            .store
            .get_user(repo.user_id)
            .await?
            .ok_or_else(LgtmError::owner_not_found)?;
        Ok((repo, user))
    }

    pub async fn resolve(
        &self,
        user: &User,
        repo: &Repo,
    ) -> Result<(Policy, MaintainerSet), LgtmError> {
        ConfigResolver::new(self.remote.as_ref(), &self.cache, &self.defaults)
            .resolve(user, repo)
            .await
    }

    async fn evaluate(&self, hook: &Hook, stage: &mut Stage) -> Result<Evaluation, LgtmError> {
        let number = hook.issue.number;
        info!(
            "Evaluating {} pr {} after activity by {}",
            hook.repo.slug,
            number,
            hook.comment
                .as_ref()
                .map(|c| c.author.as_str())
                .or(hook.review.as_ref().map(|r| r.author.as_str()))
                .unwrap_or("unknown")
        );

        let (repo, user) = self.lookup(&hook.repo.slug).await?;
        let resolver = ConfigResolver::new(self.remote.as_ref(), &self.cache, &self.defaults);

        let policy = resolver.resolve_policy(&user, &repo).await?;
        advance(stage, Stage::ConfigResolved, &repo, number);

        let maintainers = resolver.resolve_maintainers(&user, &repo, &policy).await?;
        advance(stage, Stage::MaintainersResolved, &repo, number);

        let comments = self
            .remote
            .get_comments(&user, &repo, number)
            .await
            .map_err(|e| LgtmError::GitHubError(format!("Error retrieving comments. {}", e)))?;
        let reviews = self
            .remote
            .get_reviews(&user, &repo, number)
            .await
            .map_err(|e| LgtmError::GitHubError(format!("Error retrieving reviews. {}", e)))?;
        advance(stage, Stage::EvidenceFetched, &repo, number);

        let verdict =
            ApprovalEngine::evaluate(&policy, &maintainers, &hook.issue, &comments, &reviews);
        advance(stage, Stage::Computed, &repo, number);

        let sync = enforcement::synchronize(
            self.remote.as_ref(),
            &user,
            &repo,
            number,
            verdict.granted,
            verdict.required,
        )
        .await?;
        advance(stage, Stage::Synchronized, &repo, number);

        info!(
            "{} pr {}: {} of {} approvals, approved={}",
            repo.slug, number, verdict.granted, verdict.required, verdict.approved
        );

        let evaluation = Evaluation {
            approvers: maintainers.people,
            settings: policy,
            approved: verdict.approved,
            approved_by: verdict.approved_by.clone(),
            verdict,
            sync,
        };
        advance(stage, Stage::Responded, &repo, number);
        Ok(evaluation)
    }
}

fn advance(stage: &mut Stage, next: Stage, repo: &Repo, number: u64) {
    debug!("{} pr {}: {} -> {}", repo.slug, number, stage, next);
    *stage = next;
}
