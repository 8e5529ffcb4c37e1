//! Supersedence chain resolution.

use crate::admin::{AdminApi, AdminError};
use crate::types::SupersededApplication;

/// Find the most recently created application that `application` supersedes.
///
/// Returns `Ok(None)` when the application supersedes nothing.
pub fn resolve_latest_superseded(
    api: &dyn AdminApi,
    application: &str,
) -> Result<Option<SupersededApplication>, AdminError> {
    let candidates = api.superseded_applications(application)?;
    tracing::debug!(
        app = application,
        count = candidates.len(),
        "superseded applications found"
    );
    Ok(latest_superseded(candidates))
}

/// Pick the entry with the newest `date_created`. Equal dates keep the
/// order they were given in.
pub fn latest_superseded(
    mut candidates: Vec<SupersededApplication>,
) -> Option<SupersededApplication> {
    candidates.sort_by(|a, b| b.date_created.cmp(&a.date_created));
    candidates.into_iter().next()
}
