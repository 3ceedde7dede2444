//! Helpers for keeping the approval check in a branch's required status
//! checks, and for matching installed webhooks.

use axum::http::Uri;

/// `contexts` with `context` appended exactly once, other checks kept in order.
pub fn with_context(contexts: &[String], context: &str) -> Vec<String> {
    let mut checks = without_context(contexts, context);
    checks.push(context.to_string());
    checks
}

pub fn without_context(contexts: &[String], context: &str) -> Vec<String> {
    contexts
        .iter()
        .filter(|check| check.as_str() != context)
        .cloned()
        .collect()
}

/// Whether two hook URLs point at the same host (and port).
pub fn same_host(a: &str, b: &str) -> bool {
    match (authority(a), authority(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn authority(raw: &str) -> Option<String> {
    let uri: Uri = raw.parse().ok()?;
    uri.authority().map(|a| a.as_str().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_with_context_appends_once() {
        let checks = with_context(&strings(&["ci/build", "approvals/lgtm", "ci/lint"]), "approvals/lgtm");
        assert_eq!(checks, strings(&["ci/build", "ci/lint", "approvals/lgtm"]));

        let checks = with_context(&[], "approvals/lgtm");
        assert_eq!(checks, strings(&["approvals/lgtm"]));
    }

    #[test]
    fn test_without_context() {
        let checks = without_context(&strings(&["ci/build", "approvals/lgtm"]), "approvals/lgtm");
        assert_eq!(checks, strings(&["ci/build"]));
    }

    #[test]
    fn test_same_host() {
        assert!(same_host("https://lgtm.example.com/hook", "https://lgtm.example.com/other?x=1"));
        assert!(same_host("https://LGTM.example.com/hook", "https://lgtm.example.com/hook"));
        assert!(!same_host("https://lgtm.example.com/hook", "https://ci.example.com/hook"));
        assert!(!same_host("http://localhost:8000/hook", "http://localhost:9000/hook"));
        assert!(!same_host("not a url", "https://lgtm.example.com/hook"));
    }
}
