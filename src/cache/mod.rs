//! Time-expiring cache in front of read-mostly remote lookups.
//!
//! Entries live for a fixed TTL per cache instance and are evicted lazily:
//! an expired entry is dropped the next time it is read, or by
//! [`TtlCache::purge_expired`]. The lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::database::models::{Repo, User};
use crate::error::LgtmError;
use crate::github::remote::Remote;
use crate::model::{Member, Perm, Team};

/// Default lifetime of cached lookups.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.into(), (Instant::now(), value));
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cached permission, repository, organisation and team-member lookups.
///
/// A miss calls the remote and stores only a successful result.
pub struct RemoteCache {
    perms: TtlCache<Perm>,
    repos: TtlCache<Vec<Repo>>,
    teams: TtlCache<Vec<Team>>,
    members: TtlCache<Vec<Member>>,
}

impl Default for RemoteCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl RemoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            perms: TtlCache::new(ttl),
            repos: TtlCache::new(ttl),
            teams: TtlCache::new(ttl),
            members: TtlCache::new(ttl),
        }
    }

    pub fn perm_key(user: &User, owner: &str, name: &str) -> String {
        format!("perms:{}:{}/{}", user.login, owner, name)
    }

    pub fn repos_key(user: &User) -> String {
        format!("repos:{}", user.login)
    }

    pub fn teams_key(user: &User) -> String {
        format!("teams:{}", user.login)
    }

    pub fn members_key(org: &str) -> String {
        format!("members:{}", org)
    }

    pub async fn get_perm(
        &self,
        remote: &dyn Remote,
        user: &User,
        owner: &str,
        name: &str,
    ) -> Result<Perm, LgtmError> {
        let key = Self::perm_key(user, owner, name);
        if let Some(perm) = self.perms.get(&key) {
            debug!("cache hit {}", key);
            return Ok(perm);
        }
        let perm = remote.get_perm(user, owner, name).await?;
        self.perms.set(key, perm);
        Ok(perm)
    }

    pub async fn get_repos(&self, remote: &dyn Remote, user: &User) -> Result<Vec<Repo>, LgtmError> {
        let key = Self::repos_key(user);
        if let Some(repos) = self.repos.get(&key) {
            debug!("cache hit {}", key);
            return Ok(repos);
        }
        let repos = remote.get_repos(user).await?;
        self.repos.set(key, repos.clone());
        Ok(repos)
    }

    pub async fn get_teams(&self, remote: &dyn Remote, user: &User) -> Result<Vec<Team>, LgtmError> {
        let key = Self::teams_key(user);
        if let Some(teams) = self.teams.get(&key) {
            debug!("cache hit {}", key);
            return Ok(teams);
        }
        let teams = remote.get_teams(user).await?;
        self.teams.set(key, teams.clone());
        Ok(teams)
    }

    pub async fn get_members(
        &self,
        remote: &dyn Remote,
        user: &User,
        org: &str,
    ) -> Result<Vec<Member>, LgtmError> {
        let key = Self::members_key(org);
        if let Some(members) = self.members.get(&key) {
            debug!("cache hit {}", key);
            return Ok(members);
        }
        let members = remote.get_members(user, org).await?;
        self.members.set(key, members.clone());
        Ok(members)
    }

    pub fn purge_expired(&self) -> usize {
        self.perms.purge_expired()
            + self.repos.purge_expired()
            + self.teams.purge_expired()
            + self.members.purge_expired()
    }
}
