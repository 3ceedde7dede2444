use serde::{Deserialize, Serialize};

/// A registered account; its token authenticates every remote call made on
/// behalf of the repositories it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Repo {
    pub id: i64,
    pub user_id: i64,
    pub owner: String,
    pub name: String,
    pub slug: String,
    pub link: String,
    pub private: bool,
}

impl Repo {
    /// A repository as seen on the forge, not yet tied to a stored record.
    pub fn remote(owner: &str, name: &str, slug: &str, link: &str, private: bool) -> Self {
        Self {
            id: 0,
            user_id: 0,
            owner: owner.to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
            link: link.to_string(),
            private,
        }
    }
}
