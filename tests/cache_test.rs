mod common;

use std::time::Duration;

use common::{Call, FakeRemote};
use lgtm_app::cache::RemoteCache;
use lgtm_app::database::models::User;
use lgtm_app::model::Perm;

fn user(login: &str) -> User {
    User {
        id: 1,
        login: login.to_string(),
        token: "token".to_string(),
        avatar: String::new(),
    }
}

#[tokio::test]
async fn test_members_are_fetched_once_per_org() {
    let remote = FakeRemote::new();
    remote.with_members(&["bob"]);
    let cache = RemoteCache::default();

    for _ in 0..3 {
        let members = cache
            .get_members(remote.as_ref(), &user("octo"), "acme")
            .await
            .unwrap();
        assert_eq!(members[0].login, "bob");
    }
    cache
        .get_members(remote.as_ref(), &user("octo"), "other")
        .await
        .unwrap();

    assert_eq!(
        remote.calls(),
        vec![
            Call::GetMembers("acme".to_string()),
            Call::GetMembers("other".to_string())
        ]
    );
}

#[tokio::test]
async fn test_errors_are_not_cached() {
    let remote = FakeRemote::new();
    let cache = RemoteCache::default();

    assert!(cache
        .get_members(remote.as_ref(), &user("octo"), "acme")
        .await
        .is_err());

    remote.with_members(&["bob"]);
    let members = cache
        .get_members(remote.as_ref(), &user("octo"), "acme")
        .await
        .unwrap();

    assert_eq!(members.len(), 1);
    assert_eq!(remote.calls().len(), 2);
}

#[tokio::test]
async fn test_perms_are_keyed_by_user_and_repo() {
    let remote = FakeRemote::new();
    *remote.perm.lock().unwrap() = Perm {
        pull: true,
        push: true,
        admin: true,
    };
    let cache = RemoteCache::default();

    let perm = cache
        .get_perm(remote.as_ref(), &user("octo"), "octo", "app")
        .await
        .unwrap();
    assert!(perm.admin);
    cache
        .get_perm(remote.as_ref(), &user("octo"), "octo", "app")
        .await
        .unwrap();
    cache
        .get_perm(remote.as_ref(), &user("hubot"), "octo", "app")
        .await
        .unwrap();

    let perm_calls = remote
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::GetPerm(_)))
        .count();
    assert_eq!(perm_calls, 2);
}

#[tokio::test]
async fn test_repos_and_teams_are_cached() {
    let remote = FakeRemote::new();
    let cache = RemoteCache::default();

    for _ in 0..2 {
        cache.get_repos(remote.as_ref(), &user("octo")).await.unwrap();
        cache.get_teams(remote.as_ref(), &user("octo")).await.unwrap();
    }

    assert_eq!(remote.calls(), vec![Call::GetRepos, Call::GetTeams]);
}

#[tokio::test]
async fn test_expired_entries_are_refetched() {
    let remote = FakeRemote::new();
    remote.with_members(&["bob"]);
    let cache = RemoteCache::new(Duration::ZERO);

    for _ in 0..2 {
        cache
            .get_members(remote.as_ref(), &user("octo"), "acme")
            .await
            .unwrap();
    }

    assert_eq!(remote.calls().len(), 2);
    assert_eq!(cache.purge_expired(), 1);
}
