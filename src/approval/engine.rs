//! Approval Engine
//!
//! Turns the comment and review history of a pull request into the ordered,
//! deduplicated list of maintainers credited with an approval.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

use crate::model::{Comment, Issue, MaintainerSet, Person, Policy, Review};

pub struct ApprovalEngine;

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub approved: bool,
    pub approved_by: Vec<Person>,
    pub granted: usize,
    pub required: usize,
}

impl ApprovalEngine {
    /// Credit each maintainer at most once, comments first, then reviews,
    /// in the order the remote returned them.
    ///
    /// An approval pattern that does not compile yields no approvers.
    pub fn compute_approvers(
        policy: &Policy,
        maintainers: &MaintainerSet,
        issue: &Issue,
        comments: &[Comment],
        reviews: &[Review],
    ) -> Vec<Person> {
        let mut credited: HashSet<&str> = HashSet::new();
        let mut approvers = Vec::new();

        let matcher = match Regex::new(&policy.pattern) {
            Ok(matcher) => matcher,
            Err(e) => {
                warn!("Invalid approval pattern {:?}: {}", policy.pattern, e);
                return approvers;
            }
        };

        let evidence = comments
            .iter()
            .map(|c| (c.author.as_str(), matcher.is_match(&c.body)))
            .chain(reviews.iter().map(|r| (r.author.as_str(), r.is_approved())));

        for (author, qualifies) in evidence {
            // cannot approve your own pull request
            if policy.self_approval_off && author == issue.author {
                continue;
            }
            let Some(person) = maintainers.get(author) else {
                continue;
            };
            if credited.contains(author) {
                continue;
            }
            if qualifies {
                credited.insert(author);
                approvers.push(person.clone());
            }
        }

        approvers
    }

    pub fn evaluate(
        policy: &Policy,
        maintainers: &MaintainerSet,
        issue: &Issue,
        comments: &[Comment],
        reviews: &[Review],
    ) -> Verdict {
        let approved_by =
            Self::compute_approvers(policy, maintainers, issue, comments, reviews);
        let granted = approved_by.len();
        let required = policy.approvals as usize;

        Verdict {
            approved: granted >= required,
            approved_by,
            granted,
            required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(approvals: u32, self_approval_off: bool, pattern: &str) -> Policy {
        Policy {
            approvals,
            pattern: pattern.to_string(),
            self_approval_off,
            ignore_maintainers_file: false,
        }
    }

    fn maintainers(logins: &[&str]) -> MaintainerSet {
        let mut set = MaintainerSet::default();
        for login in logins {
            set.people.insert(login.to_string(), Person::from_login(*login));
        }
        set
    }

    fn issue(author: &str) -> Issue {
        Issue {
            number: 42,
            title: "Add feature".to_string(),
            author: author.to_string(),
        }
    }

    fn comment(author: &str, body: &str) -> Comment {
        Comment {
            author: author.to_string(),
            body: body.to_string(),
        }
    }

    fn review(author: &str, state: &str) -> Review {
        Review {
            author: author.to_string(),
            body: String::new(),
            state: state.to_string(),
        }
    }

    fn logins(people: &[Person]) -> Vec<&str> {
        people.iter().map(|p| p.login.as_str()).collect()
    }

    #[test]
    fn test_self_approval_excluded() {
        let verdict = ApprovalEngine::evaluate(
            &policy(2, true, "lgtm"),
            &maintainers(&["alice", "bob"]),
            &issue("alice"),
            &[comment("alice", "lgtm"), comment("bob", "lgtm")],
            &[],
        );
        assert_eq!(logins(&verdict.approved_by), vec!["bob"]);
        assert!(!verdict.approved);
        assert_eq!(verdict.granted, 1);
        assert_eq!(verdict.required, 2);
    }

    #[test]
    fn test_self_approval_allowed_when_not_off() {
        let approvers = ApprovalEngine::compute_approvers(
            &policy(2, false, "lgtm"),
            &maintainers(&["alice", "bob"]),
            &issue("alice"),
            &[comment("alice", "lgtm"), comment("bob", "lgtm")],
            &[],
        );
        assert_eq!(logins(&approvers), vec!["alice", "bob"]);
    }

    #[test]
    fn test_comment_wins_over_review() {
        let approvers = ApprovalEngine::compute_approvers(
            &policy(2, true, "lgtm"),
            &maintainers(&["alice", "bob"]),
            &issue("alice"),
            &[comment("bob", "lgtm")],
            &[review("bob", "APPROVED")],
        );
        assert_eq!(logins(&approvers), vec!["bob"]);
    }

    #[test]
    fn test_non_matching_comment() {
        let verdict = ApprovalEngine::evaluate(
            &policy(1, false, "lgtm"),
            &maintainers(&["carol"]),
            &issue("dave"),
            &[comment("carol", "looks fine")],
            &[],
        );
        assert!(verdict.approved_by.is_empty());
        assert!(!verdict.approved);
    }

    #[test]
    fn test_non_maintainer_never_counts() {
        let approvers = ApprovalEngine::compute_approvers(
            &policy(1, false, "lgtm"),
            &maintainers(&["carol"]),
            &issue("dave"),
            &[comment("mallory", "lgtm")],
            &[review("mallory", "approved")],
        );
        assert!(approvers.is_empty());
    }

    #[test]
    fn test_duplicate_comments_counted_once() {
        let approvers = ApprovalEngine::compute_approvers(
            &policy(2, false, "(?i)lgtm"),
            &maintainers(&["bob", "carol"]),
            &issue("alice"),
            &[
                comment("bob", "LGTM"),
                comment("bob", "lgtm again"),
                comment("carol", "nit"),
                comment("bob", "lgtm"),
            ],
            &[review("bob", "approved"), review("bob", "APPROVED")],
        );
        assert_eq!(logins(&approvers), vec!["bob"]);
    }

    #[test]
    fn test_non_matching_then_matching_comment_credits() {
        let approvers = ApprovalEngine::compute_approvers(
            &policy(1, false, "lgtm"),
            &maintainers(&["bob"]),
            &issue("alice"),
            &[comment("bob", "please fix"), comment("bob", "lgtm now")],
            &[],
        );
        assert_eq!(logins(&approvers), vec!["bob"]);
    }

    #[test]
    fn test_reviews_only_count_when_approved() {
        let verdict = ApprovalEngine::evaluate(
            &policy(2, false, "lgtm"),
            &maintainers(&["bob", "carol", "dave"]),
            &issue("alice"),
            &[],
            &[
                review("bob", "CHANGES_REQUESTED"),
                review("carol", "Approved"),
                review("dave", "COMMENTED"),
                review("bob", "APPROVED"),
            ],
        );
        assert_eq!(logins(&verdict.approved_by), vec!["carol", "bob"]);
        assert!(verdict.approved);
    }

    #[test]
    fn test_self_review_excluded() {
        let approvers = ApprovalEngine::compute_approvers(
            &policy(1, true, "lgtm"),
            &maintainers(&["alice"]),
            &issue("alice"),
            &[],
            &[review("alice", "APPROVED")],
        );
        assert!(approvers.is_empty());
    }

    #[test]
    fn test_order_follows_evidence() {
        let approvers = ApprovalEngine::compute_approvers(
            &policy(3, false, "lgtm"),
            &maintainers(&["a", "b", "c"]),
            &issue("z"),
            &[comment("c", "lgtm"), comment("a", "lgtm")],
            &[review("b", "APPROVED"), review("a", "APPROVED")],
        );
        assert_eq!(logins(&approvers), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_stable_across_runs() {
        let p = policy(2, false, "lgtm");
        let m = maintainers(&["a", "b", "c"]);
        let i = issue("z");
        let comments = vec![comment("b", "lgtm"), comment("a", "lgtm"), comment("c", "nope")];
        let reviews = vec![review("c", "APPROVED")];

        let first = ApprovalEngine::compute_approvers(&p, &m, &i, &comments, &reviews);
        let second = ApprovalEngine::compute_approvers(&p, &m, &i, &comments, &reviews);
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_pattern_yields_no_approvers() {
        let approvers = ApprovalEngine::compute_approvers(
            &policy(1, false, "(lgtm"),
            &maintainers(&["bob"]),
            &issue("alice"),
            &[comment("bob", "(lgtm")],
            &[review("bob", "APPROVED")],
        );
        assert!(approvers.is_empty());
    }

    #[test]
    fn test_empty_policy_pattern_does_not_approve_objections() {
        let policy = Policy::parse(b"pattern = \"\"", &Policy::default()).unwrap();
        let approvers = ApprovalEngine::compute_approvers(
            &policy,
            &maintainers(&["bob"]),
            &issue("alice"),
            &[comment("bob", "please do not merge, this is broken")],
            &[],
        );
        assert!(approvers.is_empty());
    }

    #[test]
    fn test_surplus_approvals_still_approved() {
        let verdict = ApprovalEngine::evaluate(
            &policy(1, false, "lgtm"),
            &maintainers(&["a", "b", "c"]),
            &issue("z"),
            &[comment("a", "lgtm"), comment("b", "lgtm"), comment("c", "lgtm")],
            &[],
        );
        assert!(verdict.approved);
        assert_eq!(verdict.granted, 3);
    }
}
