use crate::error::InvalidInputError;
use crate::models::Mask;

/// Disjoint per-class masks
#[derive(Debug, Clone)]
pub struct ClassMasks {
    pub infected: Mask,
    pub normal: Mask,
}

/// Infected cells are the stained pixels; normal cells are whatever is left of
/// the candidate region once stained pixels are removed.
pub fn separate(color_mask: &Mask, candidate_mask: &Mask) -> Result<ClassMasks, InvalidInputError> {
    let normal = candidate_mask.difference(color_mask)?;
    Ok(ClassMasks {
        infected: color_mask.clone(),
        normal,
    })
}
