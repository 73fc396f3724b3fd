//! Seam to the feature-computation capability.
//!
//! The numerical definition of every feature lives behind
//! [`FeatureBackend`]; this crate only validates inputs, filters the
//! returned names and contains failures.

use crate::enums::Verbosity;
use crate::volume::{Mask, Volume};

/// Named feature values in the order the backend emitted them.
pub type FeatureMap = Vec<(String, f64)>;

pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

pub trait FeatureBackend: Send + Sync {
    /// Compute every feature for the voxels of `volume` selected by `mask`.
    ///
    /// `mask` is non-empty and shares the geometry of `volume`. The map may
    /// contain bookkeeping entries (e.g. `diagnostics_*`) next to the
    /// features proper; callers filter them by name.
    fn compute(
        &self,
        volume: &Volume,
        mask: &Mask,
        verbosity: Verbosity,
    ) -> Result<FeatureMap, BackendError>;
}
