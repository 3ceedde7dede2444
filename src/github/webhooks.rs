use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::error::LgtmError;
use crate::github::types::WebhookPayload;
use crate::model::{Comment, Hook, Issue, RepoRef, Review};

pub const EVENT_HEADER: &str = "x-github-event";
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

type HmacSha256 = Hmac<Sha256>;

/// A webhook delivery after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    Comment(Hook),
    Review(Hook),
    Irrelevant,
}

impl HookEvent {
    pub fn hook(&self) -> Option<&Hook> {
        match self {
            HookEvent::Comment(hook) | HookEvent::Review(hook) => Some(hook),
            HookEvent::Irrelevant => None,
        }
    }
}

pub struct WebhookProcessor;

impl WebhookProcessor {
    /// Classify a delivery by its `X-GitHub-Event` header and payload.
    ///
    /// Only new comments on pull requests and submitted reviews are relevant.
    /// The body is not parsed for any other event.
    pub fn classify(event: Option<&str>, body: &[u8]) -> Result<HookEvent, LgtmError> {
        match event {
            Some("issue_comment") => Self::comment_event(Self::parse(body)?),
            Some("pull_request_review") => Self::review_event(Self::parse(body)?),
            other => {
                debug!("Ignoring {:?} event", other);
                Ok(HookEvent::Irrelevant)
            }
        }
    }

    fn parse(body: &[u8]) -> Result<WebhookPayload, LgtmError> {
        serde_json::from_slice(body)
            .map_err(|e| LgtmError::WebhookError(format!("Error parsing hook. {}", e)))
    }

    fn comment_event(payload: WebhookPayload) -> Result<HookEvent, LgtmError> {
        if payload.action != "created" {
            return Ok(HookEvent::Irrelevant);
        }
        let (Some(issue), Some(comment)) = (payload.issue, payload.comment) else {
            return Ok(HookEvent::Irrelevant);
        };
        if issue.pull_request.is_none() {
            return Ok(HookEvent::Irrelevant);
        }

        Ok(HookEvent::Comment(Hook {
            repo: Self::repo_ref(payload.repository)?,
            issue: Issue {
                number: issue.number,
                title: issue.title,
                author: issue.user.login,
            },
            comment: Some(Comment {
                author: comment.user.login,
                body: comment.body,
            }),
            review: None,
        }))
    }

    fn review_event(payload: WebhookPayload) -> Result<HookEvent, LgtmError> {
        if payload.action != "submitted" {
            return Ok(HookEvent::Irrelevant);
        }
        let (Some(pull), Some(review)) = (payload.pull_request, payload.review) else {
            return Ok(HookEvent::Irrelevant);
        };

        Ok(HookEvent::Review(Hook {
            repo: Self::repo_ref(payload.repository)?,
            issue: Issue {
                number: pull.number,
                title: pull.title,
                author: pull.user.login,
            },
            comment: None,
            review: Some(Review {
                author: review.user.login,
                body: review.body.unwrap_or_default(),
                state: review.state,
            }),
        }))
    }

    fn repo_ref(
        repository: Option<crate::github::types::Repository>,
    ) -> Result<RepoRef, LgtmError> {
        let repository = repository.ok_or_else(|| {
            LgtmError::WebhookError("Error parsing hook. missing repository".to_string())
        })?;
        let owner = repository.owner.login;
        let name = repository.name;
        let slug = if repository.full_name.is_empty() {
            format!("{}/{}", owner, name)
        } else {
            repository.full_name
        };
        Ok(RepoRef { owner, name, slug })
    }

    /// Check an `X-Hub-Signature-256` header against the raw body.
    pub fn verify_signature(
        secret: &str,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<(), LgtmError> {
        let digest = signature
            .and_then(|s| s.strip_prefix("sha256="))
            .and_then(|hex_digest| hex::decode(hex_digest).ok())
            .ok_or(LgtmError::InvalidSignature)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| LgtmError::ConfigError(format!("Invalid webhook secret: {}", e)))?;
        mac.update(body);
        mac.verify_slice(&digest)
            .map_err(|_| LgtmError::InvalidSignature)
    }

    /// `sha256=<hex>` signature of `body`, as GitHub sends it.
    pub fn sign(secret: &str, body: &[u8]) -> Result<String, LgtmError> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| LgtmError::ConfigError(format!("Invalid webhook secret: {}", e)))?;
        mac.update(body);
        Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
    }
}
