use super::fix_selector::{FixRequest, FixSelector};
use crate::remediation::domain::{FixDecision, FixSelection, PackageVersion};
use crate::shared::Result;
use async_trait::async_trait;

/// Weight ratio between adjacent release components.
///
/// Large enough that any realistic minor or patch distance cannot outweigh
/// one step in a more significant component.
const COMPONENT_WEIGHT_BASE: u128 = 1000;

/// NearestVersion policy: the smallest upgrade that clears the advisories.
///
/// Release components are padded with zeros to a common length and
/// compared position by position. Each absolute difference is weighted by
/// `COMPONENT_WEIGHT_BASE^(len - i - 1)`, so earlier components dominate.
/// Ties go to the lower version.
pub struct NearestVersionSelector;

impl NearestVersionSelector {
    pub fn new() -> Self {
        Self
    }

    /// Distance score between two versions (lower is closer)
    pub fn distance(current: &PackageVersion, candidate: &PackageVersion) -> u128 {
        let a = current.release();
        let b = candidate.release();
        let len = a.len().max(b.len());

        (0..len).fold(0u128, |score, i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            let diff = u128::from(x.abs_diff(y));
            let exponent = u32::try_from(len - i - 1).unwrap_or(u32::MAX);
            let weight = COMPONENT_WEIGHT_BASE.saturating_pow(exponent);
            score.saturating_add(diff.saturating_mul(weight))
        })
    }

    /// Pure selection over already-computed candidates
    pub fn choose<'a>(
        current: &PackageVersion,
        candidates: impl IntoIterator<Item = &'a PackageVersion>,
    ) -> Option<&'a PackageVersion> {
        candidates
            .into_iter()
            .filter(|c| *c > current)
            .min_by(|x, y| {
                Self::distance(current, x)
                    .cmp(&Self::distance(current, y))
                    .then_with(|| x.cmp(y))
            })
    }
}

impl Default for NearestVersionSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FixSelector for NearestVersionSelector {
    fn name(&self) -> &'static str {
        "nearest"
    }

    async fn select(&self, request: &FixRequest) -> Result<FixDecision> {
        let Some(chosen) = Self::choose(&request.current, &request.candidates) else {
            return Ok(request.no_fix());
        };

        Ok(FixDecision::Selected(FixSelection::new(
            request.package.clone(),
            request.current.clone(),
            chosen.clone(),
            format!(
                "Closest safe version to current ({}); minimizes upgrade distance.",
                request.current
            ),
        )))
    }
}
