// SQLite schema for the user and repository store

pub const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    login       TEXT NOT NULL UNIQUE,
    token       TEXT NOT NULL,
    avatar      TEXT NOT NULL DEFAULT '',
    created_at  TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

pub const CREATE_REPOS: &str = r#"
CREATE TABLE IF NOT EXISTS repos (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    owner       TEXT NOT NULL,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    link        TEXT NOT NULL DEFAULT '',
    private     BOOLEAN NOT NULL DEFAULT 0,
    created_at  TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

pub const CREATE_REPOS_OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_repos_owner ON repos (owner)";

pub const MIGRATIONS: &[&str] = &[CREATE_USERS, CREATE_REPOS, CREATE_REPOS_OWNER_INDEX];
