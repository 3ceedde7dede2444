//! Read-only views over repository approval settings.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::LgtmError;
use crate::model::{Person, Policy};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MaintainersView {
    pub maintainers: BTreeMap<String, Person>,
    pub settings: Policy,
}

/// Maintainers and policy of a registered public repository.
///
/// Private repositories are reported as missing.
pub async fn get_maintainers(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
) -> Result<Json<MaintainersView>, LgtmError> {
    let slug = format!("{}/{}", owner, name);
    let (repo, user) = state.dispatcher.lookup(&slug).await?;
    if repo.private {
        debug!("Refusing maintainers view of private repository {}", slug);
        return Err(LgtmError::repo_not_found());
    }

    let (settings, maintainers) = state.dispatcher.resolve(&user, &repo).await?;
    Ok(Json(MaintainersView {
        maintainers: maintainers.people,
        settings,
    }))
}
