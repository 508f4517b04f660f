//! Validation run before a stroke or place interaction starts.

use crate::error::PreflightError;
use crate::pool::AssetPool;
use crate::scene::{NodeRef, SceneHost};

/// Checks both pools, repairing stale drawables where possible.
///
/// Order of checks: source pool, target pool, then overlap between the two.
/// An entry whose drawable vanished is rebound to the first existing drawable
/// below its key (a mesh that was re-created under the same transform); only
/// when none exists is it reported stale.
pub fn preflight<H: SceneHost + ?Sized>(
    host: &H,
    sources: &mut AssetPool,
    targets: &mut AssetPool,
) -> Result<(), PreflightError> {
    validate_pool(host, sources, PreflightError::EmptySourcePool)?;
    validate_pool(host, targets, PreflightError::EmptyTargetPool)?;
    if let Some(shared) = sources.shared_key(targets) {
        return Err(PreflightError::DuplicateAcrossPools(shared));
    }
    Ok(())
}

fn validate_pool<H: SceneHost + ?Sized>(
    host: &H,
    pool: &mut AssetPool,
    when_empty: PreflightError,
) -> Result<(), PreflightError> {
    if pool.is_empty() {
        return Err(when_empty);
    }

    let stale: Vec<NodeRef> = pool
        .entries()
        .into_iter()
        .filter(|e| !host.node_exists(&e.drawable))
        .map(|e| e.key.clone())
        .collect();

    for key in stale {
        let replacement = host
            .descendant_drawables(&key)
            .into_iter()
            .find(|d| host.node_exists(d));
        match (replacement, pool.get_mut(&key)) {
            (Some(drawable), Some(entry)) => {
                log::info!("{} lost its drawable, using {} instead", key, drawable);
                entry.drawable = drawable;
            }
            _ => return Err(PreflightError::StaleReference(key)),
        }
    }
    Ok(())
}
