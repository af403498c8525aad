use crate::{BuildId, DepotId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing depot")]
    MissingDepot,
    #[error("invalid build range")]
    InvalidBuildRange,
}

/// A validated build range, normalized so `from` precedes `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRange {
    pub from: BuildId,
    pub to: BuildId,
    /// True when the caller supplied the endpoints in reverse order.
    pub swapped: bool,
}

/// Validate a depot + build selection against the page listing.
///
/// `listing` is the app page's build list, most recent first.
pub fn normalize_range(
    depot_id: &DepotId,
    from: &BuildId,
    to: &BuildId,
    listing: &[BuildId],
) -> Result<BuildRange, ValidationError> {
    if depot_id.is_empty() {
        return Err(ValidationError::MissingDepot);
    }
    let from_pos = ascending_position(listing, from).ok_or(ValidationError::InvalidBuildRange)?;
    let to_pos = ascending_position(listing, to).ok_or(ValidationError::InvalidBuildRange)?;

    if from_pos < to_pos {
        Ok(BuildRange {
            from: from.clone(),
            to: to.clone(),
            swapped: false,
        })
    } else {
        Ok(BuildRange {
            from: to.clone(),
            to: from.clone(),
            swapped: from_pos != to_pos,
        })
    }
}

/// Builds produced after `range.from` up to and including `range.to`, oldest first.
pub fn intermediary_builds(listing: &[BuildId], range: &BuildRange) -> Vec<BuildId> {
    let ascending: Vec<&BuildId> = listing.iter().rev().collect();
    let (Some(from_pos), Some(to_pos)) = (
        ascending.iter().position(|b| *b == &range.from),
        ascending.iter().position(|b| *b == &range.to),
    ) else {
        return Vec::new();
    };
    if from_pos >= to_pos {
        return Vec::new();
    }
    ascending[from_pos + 1..=to_pos]
        .iter()
        .map(|b| (*b).clone())
        .collect()
}

fn ascending_position(listing: &[BuildId], build: &BuildId) -> Option<usize> {
    if build.is_empty() {
        return None;
    }
    listing
        .iter()
        .rev()
        .position(|candidate| candidate == build)
}
