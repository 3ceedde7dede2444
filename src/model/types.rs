use serde::{Deserialize, Serialize};

/// The pull request under evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub author: String,
    pub body: String,
    pub state: String,
}

impl Review {
    pub fn is_approved(&self) -> bool {
        self.state.eq_ignore_ascii_case("approved")
    }
}

/// Repository permissions of the acting user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perm {
    pub pull: bool,
    pub push: bool,
    pub admin: bool,
}

/// An organisation the user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub login: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub login: String,
}

/// Repository identity as carried by a webhook payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub slug: String,
}

/// A normalized comment or review delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    pub repo: RepoRef,
    pub issue: Issue,
    pub comment: Option<Comment>,
    pub review: Option<Review>,
}
