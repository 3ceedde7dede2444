pub mod labels;
pub mod status_checks;

use serde::Serialize;
use tracing::{info, warn};

use crate::database::models::{Repo, User};
use crate::error::LgtmError;
use crate::github::remote::Remote;

pub use labels::LabelDiff;
pub use status_checks::{CommitStatus, StatusState};

/// What one synchronization pushed to the forge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub status: CommitStatus,
    pub labels: LabelDiff,
    pub labels_synced: bool,
}

/// Record the approval count on the pull request.
///
/// The commit status must land; its failure is returned. Labels are
/// best-effort: listing, adding or removing them may fail without aborting.
pub async fn synchronize(
    remote: &dyn Remote,
    user: &User,
    repo: &Repo,
    number: u64,
    granted: usize,
    required: usize,
) -> Result<SyncReport, LgtmError> {
    let status = CommitStatus::from_counts(granted, required);
    remote
        .set_status(user, repo, number, granted, required)
        .await?;

    let mut labels_synced = true;
    let current = match remote.get_issue_labels(user, repo, number).await {
        Ok(labels) => labels,
        Err(e) => {
            warn!("Error retrieving labels for {} pr {}. {}", repo.slug, number, e);
            labels_synced = false;
            Vec::new()
        }
    };

    let diff = LabelDiff::compute(granted, &current);

    if !diff.to_remove.is_empty() {
        if let Err(e) = remote
            .remove_issue_labels(user, repo, number, &diff.to_remove)
            .await
        {
            warn!("Error removing old labels for {} pr {}. {}", repo.slug, number, e);
            labels_synced = false;
        }
    }

    if !diff.to_add.is_empty() {
        if let Err(e) = remote.add_issue_labels(user, repo, number, &diff.to_add).await {
            warn!("Error adding new label for {} pr {}. {}", repo.slug, number, e);
            labels_synced = false;
        }
    }

    info!(
        "Synchronized {} pr {}: status {}, +{:?} -{:?}",
        repo.slug,
        number,
        status.state.as_str(),
        diff.to_add,
        diff.to_remove
    );

    Ok(SyncReport {
        status,
        labels: diff,
        labels_synced,
    })
}
