use serde::{Deserialize, Serialize};

use crate::github::remote::STATUS_CONTEXT;

/// GitHub commit status states used by the approval check
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Success,
    Pending,
}

impl StatusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusState::Success => "success",
            StatusState::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub state: StatusState,
    pub description: String,
    pub context: String,
}

impl CommitStatus {
    /// `success` once `granted` reaches `required`, `pending` with a progress
    /// description otherwise.
    pub fn from_counts(granted: usize, required: usize) -> Self {
        let (state, description) = if granted >= required {
            (StatusState::Success, "this commit looks good".to_string())
        } else {
            (
                StatusState::Pending,
                format!("{} of {} required approvals granted", granted, required),
            )
        };

        Self {
            state,
            description,
            context: STATUS_CONTEXT.to_string(),
        }
    }
}
