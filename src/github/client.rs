use async_trait::async_trait;
use base64::Engine;
use octocrab::{Octocrab, Page};
use serde_json::Value;
use tracing::{debug, info};

use crate::database::models::{Repo, User};
use crate::enforcement::CommitStatus;
use crate::error::LgtmError;
use crate::github::protection::{same_host, with_context, without_context};
use crate::github::remote::{Remote, STATUS_CONTEXT};
use crate::github::types;
use crate::model::{Comment, Member, Perm, Review, Team};

const PER_PAGE: [(&str, &str); 1] = [("per_page", "100")];
const HOOK_EVENTS: [&str; 2] = ["issue_comment", "pull_request_review"];
const MAINTAINERS_TEAM: &str = "maintainers";

/// [`Remote`] backed by the GitHub REST API.
///
/// A client is built per call from the acting user's token.
pub struct GitHubClient {
    api_url: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    fn client(&self, user: &User) -> Result<Octocrab, LgtmError> {
        Octocrab::builder()
            .base_uri(self.api_url.as_str())
            .map_err(|e| LgtmError::ConfigError(format!("Invalid GitHub API url: {}", e)))?
            .personal_token(user.token.clone())
            .build()
            .map_err(|e| {
                LgtmError::GitHubError(format!("Failed to create GitHub client: {}", e))
            })
    }

    fn repo_route(repo: &Repo) -> String {
        format!("/repos/{}/{}", repo.owner, repo.name)
    }

    async fn fetch_repository(
        octo: &Octocrab,
        owner: &str,
        name: &str,
    ) -> Result<types::Repository, LgtmError> {
        octo.get(format!("/repos/{}/{}", owner, name), None::<&()>)
            .await
            .map_err(|e| LgtmError::GitHubError(format!("Error fetching repository. {}", e)))
    }

    async fn default_branch(octo: &Octocrab, repo: &Repo) -> Result<String, LgtmError> {
        let repository = Self::fetch_repository(octo, &repo.owner, &repo.name).await?;
        Ok(repository
            .default_branch
            .unwrap_or_else(|| "main".to_string()))
    }

    /// The installed hook whose url shares a host with `link`.
    async fn find_hook(
        octo: &Octocrab,
        repo: &Repo,
        link: &str,
    ) -> Result<Option<types::Hook>, LgtmError> {
        let page: Page<types::Hook> = octo
            .get(format!("{}/hooks", Self::repo_route(repo)), Some(&PER_PAGE))
            .await?;
        let hooks = octo.all_pages(page).await?;
        Ok(hooks.into_iter().find(|hook| {
            hook.config
                .url
                .as_deref()
                .map(|url| same_host(url, link))
                .unwrap_or(false)
        }))
    }

    async fn delete(octo: &Octocrab, route: &str) -> Result<(), octocrab::Error> {
        let response = octo._delete(route, None::<&()>).await?;
        octocrab::map_github_error(response).await?;
        Ok(())
    }

    async fn required_checks(
        octo: &Octocrab,
        repo: &Repo,
        branch: &str,
    ) -> Option<types::RequiredStatusChecks> {
        let route = format!(
            "{}/branches/{}/protection/required_status_checks",
            Self::repo_route(repo),
            urlencoding::encode(branch)
        );
        match octo.get(route, None::<&()>).await {
            Ok(checks) => Some(checks),
            Err(e) => {
                debug!("No required status checks on {} {}: {}", repo.slug, branch, e);
                None
            }
        }
    }

    fn to_repo(owner: &str, name: &str, repository: &types::Repository) -> Repo {
        let owner = if repository.owner.login.is_empty() {
            owner
        } else {
            repository.owner.login.as_str()
        };
        let name = if repository.name.is_empty() {
            name
        } else {
            repository.name.as_str()
        };
        let slug = if repository.full_name.is_empty() {
            format!("{}/{}", owner, name)
        } else {
            repository.full_name.clone()
        };
        Repo::remote(owner, name, &slug, &repository.html_url, repository.private)
    }
}

#[async_trait]
impl Remote for GitHubClient {
    async fn get_repo(&self, user: &User, owner: &str, name: &str) -> Result<Repo, LgtmError> {
        let octo = self.client(user)?;
        let repository = Self::fetch_repository(&octo, owner, name).await?;
        Ok(Self::to_repo(owner, name, &repository))
    }

    async fn get_perm(&self, user: &User, owner: &str, name: &str) -> Result<Perm, LgtmError> {
        let octo = self.client(user)?;
        let repository = Self::fetch_repository(&octo, owner, name).await?;
        Ok(repository
            .permissions
            .map(|p| Perm {
                pull: p.pull,
                push: p.push,
                admin: p.admin,
            })
            .unwrap_or_default())
    }

    async fn get_repos(&self, user: &User) -> Result<Vec<Repo>, LgtmError> {
        let octo = self.client(user)?;
        let page: Page<types::Repository> = octo.get("/user/repos", Some(&PER_PAGE)).await?;
        let repositories = octo.all_pages(page).await?;
        Ok(repositories
            .iter()
            .filter(|r| r.permissions.map(|p| p.admin).unwrap_or(false))
            .map(|r| Self::to_repo(&r.owner.login, &r.name, r))
            .collect())
    }

    async fn get_teams(&self, user: &User) -> Result<Vec<Team>, LgtmError> {
        let octo = self.client(user)?;
        let page: Page<types::Organization> = octo.get("/user/orgs", Some(&PER_PAGE)).await?;
        let orgs = octo.all_pages(page).await?;
        Ok(orgs
            .into_iter()
            .map(|org| Team {
                login: org.login,
                avatar: org.avatar_url,
            })
            .collect())
    }

    async fn get_members(&self, user: &User, org: &str) -> Result<Vec<Member>, LgtmError> {
        let octo = self.client(user)?;
        let page: Page<types::Team> = octo
            .get(format!("/orgs/{}/teams", org), Some(&PER_PAGE))
            .await
            .map_err(|e| LgtmError::GitHubError(format!("Error accessing team list. {}", e)))?;
        let teams = octo.all_pages(page).await?;

        let team = teams
            .into_iter()
            .find(|t| t.name.eq_ignore_ascii_case(MAINTAINERS_TEAM))
            .ok_or_else(|| {
                LgtmError::MaintainersError(format!("Error finding approvers team for {}", org))
            })?;

        let page: Page<types::User> = octo
            .get(
                format!("/orgs/{}/teams/{}/members", org, team.slug),
                Some(&PER_PAGE),
            )
            .await
            .map_err(|e| LgtmError::GitHubError(format!("Error getting team members. {}", e)))?;
        let members = octo.all_pages(page).await?;
        Ok(members
            .into_iter()
            .map(|m| Member { login: m.login })
            .collect())
    }

    async fn get_comments(
        &self,
        user: &User,
        repo: &Repo,
        number: u64,
    ) -> Result<Vec<Comment>, LgtmError> {
        let octo = self.client(user)?;
        let route = format!("{}/issues/{}/comments", Self::repo_route(repo), number);
        let page: Page<types::Comment> = octo.get(route, Some(&PER_PAGE)).await?;
        let comments = octo.all_pages(page).await?;
        Ok(comments
            .into_iter()
            .map(|c| Comment {
                author: c.user.login,
                body: c.body,
            })
            .collect())
    }

    async fn get_reviews(
        &self,
        user: &User,
        repo: &Repo,
        number: u64,
    ) -> Result<Vec<Review>, LgtmError> {
        let octo = self.client(user)?;
        let route = format!("{}/pulls/{}/reviews", Self::repo_route(repo), number);
        let page: Page<types::Review> = octo.get(route, Some(&PER_PAGE)).await?;
        let reviews = octo.all_pages(page).await?;
        Ok(reviews
            .into_iter()
            .map(|r| Review {
                author: r.user.login,
                body: r.body.unwrap_or_default(),
                state: r.state,
            })
            .collect())
    }

    async fn get_contents(
        &self,
        user: &User,
        repo: &Repo,
        path: &str,
    ) -> Result<Vec<u8>, LgtmError> {
        let octo = self.client(user)?;
        let encoded_path = path
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");
        let route = format!("{}/contents/{}", Self::repo_route(repo), encoded_path);
        let content: types::Content = octo.get(route, None::<&()>).await?;

        let raw = content.content.unwrap_or_default();
        let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .map_err(|e| LgtmError::GitHubError(format!("Error decoding {}: {}", path, e)))
    }

    async fn set_status(
        &self,
        user: &User,
        repo: &Repo,
        number: u64,
        granted: usize,
        required: usize,
    ) -> Result<(), LgtmError> {
        let octo = self.client(user)?;
        let pull: types::PullRequest = octo
            .get(
                format!("{}/pulls/{}", Self::repo_route(repo), number),
                None::<&()>,
            )
            .await
            .map_err(|e| LgtmError::GitHubError(format!("Error fetching pull request. {}", e)))?;

        let status = CommitStatus::from_counts(granted, required);
        let body = types::CreateStatus {
            state: status.state.as_str().to_string(),
            description: status.description,
            context: status.context,
        };
        let route = format!("{}/statuses/{}", Self::repo_route(repo), pull.head.sha);
        let _: Value = octo
            .post(route, Some(&body))
            .await
            .map_err(|e| LgtmError::GitHubError(format!("Error setting status. {}", e)))?;
        Ok(())
    }

    async fn get_issue_labels(
        &self,
        user: &User,
        repo: &Repo,
        number: u64,
    ) -> Result<Vec<String>, LgtmError> {
        let octo = self.client(user)?;
        let route = format!("{}/issues/{}/labels", Self::repo_route(repo), number);
        let page: Page<types::Label> = octo.get(route, Some(&PER_PAGE)).await?;
        let labels = octo.all_pages(page).await?;
        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    async fn add_issue_labels(
        &self,
        user: &User,
        repo: &Repo,
        number: u64,
        labels: &[String],
    ) -> Result<(), LgtmError> {
        let octo = self.client(user)?;
        let route = format!("{}/issues/{}/labels", Self::repo_route(repo), number);
        let _: Value = octo
            .post(route, Some(&serde_json::json!({ "labels": labels })))
            .await?;
        Ok(())
    }

    async fn remove_issue_labels(
        &self,
        user: &User,
        repo: &Repo,
        number: u64,
        labels: &[String],
    ) -> Result<(), LgtmError> {
        let octo = self.client(user)?;
        for label in labels {
            let route = format!(
                "{}/issues/{}/labels/{}",
                Self::repo_route(repo),
                number,
                urlencoding::encode(label)
            );
            match Self::delete(&octo, &route).await {
                Ok(()) => {}
                Err(octocrab::Error::GitHub { source, .. }) if source.status_code.as_u16() == 404 => {
                    debug!("Label {:?} already removed from {} pr {}", label, repo.slug, number);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn set_hook(&self, user: &User, repo: &Repo, link: &str) -> Result<(), LgtmError> {
        let octo = self.client(user)?;

        if let Some(existing) = Self::find_hook(&octo, repo, link).await? {
            let route = format!("{}/hooks/{}", Self::repo_route(repo), existing.id);
            Self::delete(&octo, &route).await?;
        }

        let hook = types::CreateHook {
            name: "web".to_string(),
            active: true,
            events: HOOK_EVENTS.iter().map(|e| e.to_string()).collect(),
            config: types::HookConfig {
                url: Some(link.to_string()),
                content_type: Some("json".to_string()),
            },
        };
        let _: Value = octo
            .post(format!("{}/hooks", Self::repo_route(repo)), Some(&hook))
            .await
            .map_err(|e| LgtmError::GitHubError(format!("Error creating hook. {}", e)))?;

        let branch = Self::default_branch(&octo, repo).await?;
        let branch_route = format!(
            "{}/branches/{}/protection",
            Self::repo_route(repo),
            urlencoding::encode(&branch)
        );

        match Self::required_checks(&octo, repo, &branch).await {
            Some(checks) => {
                let patch = types::RequiredStatusChecks {
                    strict: checks.strict,
                    contexts: with_context(&checks.contexts, STATUS_CONTEXT),
                };
                let _: Value = octo
                    .patch(
                        format!("{}/required_status_checks", branch_route),
                        Some(&patch),
                    )
                    .await?;
            }
            None => {
                let protection = types::BranchProtection {
                    required_status_checks: Some(types::RequiredStatusChecks {
                        strict: true,
                        contexts: vec![STATUS_CONTEXT.to_string()],
                    }),
                    enforce_admins: false,
                    required_pull_request_reviews: None,
                    restrictions: None,
                };
                let _: Value = octo.put(branch_route, Some(&protection)).await?;
            }
        }

        info!("Enabled hook for {} on branch {}", repo.slug, branch);
        Ok(())
    }

    async fn del_hook(&self, user: &User, repo: &Repo, link: &str) -> Result<(), LgtmError> {
        let octo = self.client(user)?;

        let Some(existing) = Self::find_hook(&octo, repo, link).await? else {
            debug!("No hook for {} at {}", repo.slug, link);
            return Ok(());
        };
        let route = format!("{}/hooks/{}", Self::repo_route(repo), existing.id);
        Self::delete(&octo, &route).await?;

        let branch = Self::default_branch(&octo, repo).await?;
        if let Some(checks) = Self::required_checks(&octo, repo, &branch).await {
            if checks.contexts.iter().any(|c| c == STATUS_CONTEXT) {
                let patch = types::RequiredStatusChecks {
                    strict: checks.strict,
                    contexts: without_context(&checks.contexts, STATUS_CONTEXT),
                };
                let route = format!(
                    "{}/branches/{}/protection/required_status_checks",
                    Self::repo_route(repo),
                    urlencoding::encode(&branch)
                );
                let _: Value = octo.patch(route, Some(&patch)).await?;
            }
        }

        info!("Disabled hook for {}", repo.slug);
        Ok(())
    }
}
