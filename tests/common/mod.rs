#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use lgtm_app::cache::RemoteCache;
use lgtm_app::database::models::{Repo, User};
use lgtm_app::database::Database;
use lgtm_app::github::Remote;
use lgtm_app::model::{Comment, Member, Perm, Policy, Review, Team};
use lgtm_app::webhooks::Dispatcher;
use lgtm_app::LgtmError;

/// Setup an in-memory SQLite database for testing
pub async fn setup_test_db() -> Database {
    Database::new_in_memory()
        .await
        .expect("Failed to create test database")
}

/// Store `octo` and its repository `octo/app`, returning both.
pub async fn seed_repo(db: &Database, private: bool) -> (User, Repo) {
    let user = db.create_user("octo", "octo-token", "").await.unwrap();
    let repo = db
        .create_repo(
            user.id,
            &Repo::remote("octo", "app", "octo/app", "https://github.com/octo/app", private),
        )
        .await
        .unwrap();
    (user, repo)
}

/// A remote call as recorded by [`FakeRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetContents(String),
    GetMembers(String),
    GetComments(u64),
    GetReviews(u64),
    SetStatus { number: u64, granted: usize, required: usize },
    GetIssueLabels(u64),
    AddIssueLabels(Vec<String>),
    RemoveIssueLabels(Vec<String>),
    GetPerm(String),
    GetRepos,
    GetTeams,
}

/// In-memory forge that records every call it receives.
#[derive(Default)]
pub struct FakeRemote {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub members: Mutex<Option<Vec<String>>>,
    pub comments: Mutex<Vec<Comment>>,
    pub reviews: Mutex<Vec<Review>>,
    pub labels: Mutex<Vec<String>>,
    pub perm: Mutex<Perm>,
    /// Operation names that fail, e.g. `"set_status"`.
    pub failing: Mutex<HashSet<&'static str>>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_file(&self, path: &str, body: &str) -> &Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), body.as_bytes().to_vec());
        self
    }

    pub fn with_members(&self, logins: &[&str]) -> &Self {
        *self.members.lock().unwrap() = Some(logins.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn with_comment(&self, author: &str, body: &str) -> &Self {
        self.comments.lock().unwrap().push(Comment {
            author: author.to_string(),
            body: body.to_string(),
        });
        self
    }

    pub fn with_review(&self, author: &str, state: &str) -> &Self {
        self.reviews.lock().unwrap().push(Review {
            author: author.to_string(),
            body: String::new(),
            state: state.to_string(),
        });
        self
    }

    pub fn with_labels(&self, labels: &[&str]) -> &Self {
        *self.labels.lock().unwrap() = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn failing(&self, operation: &'static str) -> &Self {
        self.failing.lock().unwrap().insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::SetStatus { .. }))
            .collect()
    }

    pub fn label_mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::AddIssueLabels(_) | Call::RemoveIssueLabels(_)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, operation: &'static str) -> Result<(), LgtmError> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(LgtmError::GitHubError(format!("{} failed", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl Remote for FakeRemote {
    async fn get_repo(&self, _user: &User, owner: &str, name: &str) -> Result<Repo, LgtmError> {
        self.check("get_repo")?;
        let slug = format!("{}/{}", owner, name);
        Ok(Repo::remote(owner, name, &slug, "", false))
    }

    async fn get_perm(&self, _user: &User, owner: &str, name: &str) -> Result<Perm, LgtmError> {
        self.record(Call::GetPerm(format!("{}/{}", owner, name)));
        self.check("get_perm")?;
        Ok(*self.perm.lock().unwrap())
    }

    async fn get_repos(&self, _user: &User) -> Result<Vec<Repo>, LgtmError> {
        self.record(Call::GetRepos);
        self.check("get_repos")?;
        Ok(vec![Repo::remote("octo", "app", "octo/app", "", false)])
    }

    async fn get_teams(&self, _user: &User) -> Result<Vec<Team>, LgtmError> {
        self.record(Call::GetTeams);
        self.check("get_teams")?;
        Ok(vec![Team {
            login: "octo".to_string(),
            avatar: String::new(),
        }])
    }

    async fn get_members(&self, _user: &User, org: &str) -> Result<Vec<Member>, LgtmError> {
        self.record(Call::GetMembers(org.to_string()));
        self.check("get_members")?;
        match self.members.lock().unwrap().clone() {
            Some(logins) => Ok(logins.into_iter().map(|login| Member { login }).collect()),
            None => Err(LgtmError::MaintainersError(format!(
                "Error finding approvers team for {}",
                org
            ))),
        }
    }

    async fn get_comments(
        &self,
        _user: &User,
        _repo: &Repo,
        number: u64,
    ) -> Result<Vec<Comment>, LgtmError> {
        self.record(Call::GetComments(number));
        self.check("get_comments")?;
        Ok(self.comments.lock().unwrap().clone())
    }

    async fn get_reviews(
        &self,
        _user: &User,
        _repo: &Repo,
        number: u64,
    ) -> Result<Vec<Review>, LgtmError> {
        self.record(Call::GetReviews(number));
        self.check("get_reviews")?;
        Ok(self.reviews.lock().unwrap().clone())
    }

    async fn get_contents(
        &self,
        _user: &User,
        _repo: &Repo,
        path: &str,
    ) -> Result<Vec<u8>, LgtmError> {
        self.record(Call::GetContents(path.to_string()));
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| LgtmError::GitHubError(format!("404 Not Found: {}", path)))
    }

    async fn set_status(
        &self,
        _user: &User,
        _repo: &Repo,
        number: u64,
        granted: usize,
        required: usize,
    ) -> Result<(), LgtmError> {
        self.record(Call::SetStatus {
            number,
            granted,
            required,
        });
        self.check("set_status")
    }

    async fn get_issue_labels(
        &self,
        _user: &User,
        _repo: &Repo,
        number: u64,
    ) -> Result<Vec<String>, LgtmError> {
        self.record(Call::GetIssueLabels(number));
        self.check("get_issue_labels")?;
        Ok(self.labels.lock().unwrap().clone())
    }

    async fn add_issue_labels(
        &self,
        _user: &User,
        _repo: &Repo,
        _number: u64,
        labels: &[String],
    ) -> Result<(), LgtmError> {
        self.record(Call::AddIssueLabels(labels.to_vec()));
        self.check("add_issue_labels")?;
        self.labels.lock().unwrap().extend(labels.iter().cloned());
        Ok(())
    }

    async fn remove_issue_labels(
        &self,
        _user: &User,
        _repo: &Repo,
        _number: u64,
        labels: &[String],
    ) -> Result<(), LgtmError> {
        self.record(Call::RemoveIssueLabels(labels.to_vec()));
        self.check("remove_issue_labels")?;
        self.labels
            .lock()
            .unwrap()
            .retain(|label| !labels.contains(label));
        Ok(())
    }

    async fn set_hook(&self, _user: &User, _repo: &Repo, _link: &str) -> Result<(), LgtmError> {
        self.check("set_hook")
    }

    async fn del_hook(&self, _user: &User, _repo: &Repo, _link: &str) -> Result<(), LgtmError> {
        self.check("del_hook")
    }
}

/// Dispatcher over `remote` and a store seeded with `octo/app`.
pub async fn dispatcher(remote: Arc<FakeRemote>) -> (Dispatcher, Database) {
    let db = setup_test_db().await;
    seed_repo(&db, false).await;
    let dispatcher = Dispatcher::new(
        remote,
        Arc::new(db.clone()),
        Arc::new(RemoteCache::default()),
        Policy::default(),
    );
    (dispatcher, db)
}

/// Webhook payload builders
pub mod github_mocks {
    use serde_json::{json, Value};

    pub fn repository(full_name: &str) -> Value {
        let (owner, name) = full_name.split_once('/').unwrap_or((full_name, ""));
        json!({
            "name": name,
            "full_name": full_name,
            "owner": { "login": owner },
            "private": false,
            "html_url": format!("https://github.com/{}", full_name)
        })
    }

    pub fn comment_event(full_name: &str, number: u64, issue_author: &str, commenter: &str, body: &str) -> Value {
        json!({
            "action": "created",
            "issue": {
                "number": number,
                "title": "Improve things",
                "user": { "login": issue_author },
                "pull_request": {
                    "url": format!("https://api.github.com/repos/{}/pulls/{}", full_name, number)
                }
            },
            "comment": {
                "body": body,
                "user": { "login": commenter }
            },
            "repository": repository(full_name)
        })
    }

    pub fn review_event(full_name: &str, number: u64, pr_author: &str, reviewer: &str, state: &str) -> Value {
        json!({
            "action": "submitted",
            "review": {
                "body": null,
                "state": state,
                "user": { "login": reviewer }
            },
            "pull_request": {
                "number": number,
                "title": "Improve things",
                "url": format!("https://api.github.com/repos/{}/pulls/{}", full_name, number),
                "user": { "login": pr_author }
            },
            "repository": repository(full_name)
        })
    }
}
