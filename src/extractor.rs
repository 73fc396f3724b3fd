use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::backend::{FeatureBackend, FeatureMap};
use crate::enums::Verbosity;
use crate::error::{RadiomicsError, Result, ensure_exists};
use crate::region::{Region, RegionMask};
use crate::volume::{Mask, Volume};
use crate::volume_loader::VolumeReader;

/// Features computed for one region.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureRecord {
    pub region_name: String,
    pub features: FeatureMap,
}

/// Wraps a [`FeatureBackend`] with input validation and failure isolation.
#[derive(Clone)]
pub struct RegionExtractor {
    backend: Arc<dyn FeatureBackend>,
    mask_reader: Arc<dyn VolumeReader>,
    feature_prefix: String,
    verbosity: Verbosity,
}

impl RegionExtractor {
    pub fn new(
        backend: Arc<dyn FeatureBackend>,
        mask_reader: Arc<dyn VolumeReader>,
        feature_prefix: impl Into<String>,
        verbosity: Verbosity,
    ) -> Self {
        Self {
            backend,
            mask_reader,
            feature_prefix: feature_prefix.into(),
            verbosity,
        }
    }

    /// Extract one region, containing every failure.
    ///
    /// Returns `None` for empty regions, regions without usable features and
    /// regions whose mask or feature computation failed. Failures are logged
    /// with the region name and never reach the caller.
    pub fn extract_one(&self, volume: &Volume, region: &Region) -> Option<FeatureRecord> {
        match self.try_extract(volume, region) {
            Ok(record) => record,
            Err(err) => {
                error!(region = %region.name, error = %err, "Failed to extract radiomics for region");
                None
            }
        }
    }

    /// Like [`extract_one`](Self::extract_one) but surfaces the failure.
    pub fn try_extract(&self, volume: &Volume, region: &Region) -> Result<Option<FeatureRecord>> {
        let mask: Cow<'_, Mask> = match &region.mask {
            RegionMask::File(path) => {
                ensure_exists(path)?;
                Cow::Owned(Mask::from_volume(&self.mask_reader.read(path)?))
            }
            RegionMask::Labelled(mask) => Cow::Borrowed(mask.as_ref()),
        };

        if mask.is_empty() {
            warn!(region = %region.name, "Region mask is empty, skipping extraction");
            return Ok(None);
        }

        if mask.dim() != volume.dim() {
            return Err(RadiomicsError::GeometryMismatch {
                mask: mask.dim(),
                volume: volume.dim(),
            });
        }

        let features: FeatureMap = self
            .backend
            .compute(volume, &mask, self.verbosity)
            .map_err(|source| RadiomicsError::Backend {
                region: region.name.clone(),
                source,
            })?
            .into_iter()
            .filter(|(name, _)| name.starts_with(&self.feature_prefix))
            .collect();

        if features.is_empty() {
            debug!(region = %region.name, "Backend returned no usable features");
            return Ok(None);
        }

        Ok(Some(FeatureRecord {
            region_name: region.name.clone(),
            features,
        }))
    }
}
