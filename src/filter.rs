//! Resume cursor and blocklist applied to the discovered id sequence

use crate::error::{Error, Result};
use crate::types::ResourceId;
use std::collections::HashSet;
use tracing::{debug, info};

/// Narrow `ids` to the ones that should be downloaded
///
/// With `resume_from`, everything before the first occurrence of that id is
/// dropped. Blocklisted ids are then removed. Relative order is preserved.
///
/// # Errors
/// [`Error::ResumeIdNotFound`] if `resume_from` is not in `ids`.
pub fn filter_ids(
    ids: &[ResourceId],
    blocklist: &[ResourceId],
    resume_from: Option<&ResourceId>,
) -> Result<Vec<ResourceId>> {
    let start = match resume_from {
        Some(cursor) => {
            let index = ids
                .iter()
                .position(|id| id == cursor)
                .ok_or_else(|| Error::ResumeIdNotFound(cursor.clone()))?;
            info!(%cursor, skipped = index, "resuming from id");
            index
        }
        None => 0,
    };

    let blocked: HashSet<&ResourceId> = blocklist.iter().collect();
    let kept: Vec<ResourceId> = ids[start..]
        .iter()
        .filter(|id| !blocked.contains(id))
        .cloned()
        .collect();

    debug!(
        discovered = ids.len(),
        after_resume = ids.len() - start,
        kept = kept.len(),
        "filtered ids"
    );
    Ok(kept)
}
