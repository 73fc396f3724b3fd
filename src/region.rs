use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::enums::RegionOrigin;
use crate::error::{RadiomicsError, Result, ensure_exists};
use crate::volume::{Mask, Volume};
use crate::volume_loader::VolumeReader;

/// Replace every character outside `[A-Za-z0-9_ -]` with `_`.
pub fn sanitize_region_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | ' ' | '-' => c,
            _ => '_',
        })
        .collect()
}

/// Where a region's voxels come from.
#[derive(Clone, Debug)]
pub enum RegionMask {
    /// Mask file read lazily by the extraction task that needs it.
    File(PathBuf),
    /// Mask derived from one atlas label.
    Labelled(Arc<Mask>),
}

#[derive(Clone, Debug)]
pub struct Region {
    pub name: String,
    pub mask: RegionMask,
}

impl Region {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name: sanitize_region_name(&stem),
            mask: RegionMask::File(path),
        }
    }

    pub fn from_label(name: &str, mask: Mask) -> Self {
        Self {
            name: sanitize_region_name(name),
            mask: RegionMask::Labelled(Arc::new(mask)),
        }
    }

    pub fn origin(&self) -> RegionOrigin {
        match self.mask {
            RegionMask::File(_) => RegionOrigin::File,
            RegionMask::Labelled(_) => RegionOrigin::AtlasLabel,
        }
    }
}

/// The two ways a pass can be told which regions to extract.
#[derive(Clone, Debug)]
pub enum RegionSource {
    MaskFiles(Vec<PathBuf>),
    Atlas { atlas: PathBuf, labels: PathBuf },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelEntry {
    pub label: i64,
    pub name: String,
}

/// Headerless two-column `Label,Name` table describing an atlas.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelTable {
    pub entries: Vec<LabelEntry>,
}

impl LabelTable {
    pub fn load(path: &Path) -> Result<Self> {
        ensure_exists(path)?;
        let file = std::fs::File::open(path)?;
        Self::from_reader(file).map_err(|err| match err {
            RadiomicsError::InvalidFormat(msg) => {
                RadiomicsError::InvalidFormat(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut entries = Vec::new();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.len() != 2 {
                return Err(RadiomicsError::InvalidFormat(format!(
                    "label table must contain exactly 2 columns [Label, Name], row {} has {}",
                    row + 1,
                    record.len()
                )));
            }
            let label = record[0].trim().parse::<i64>().map_err(|_| {
                RadiomicsError::InvalidFormat(format!(
                    "label '{}' on row {} is not an integer",
                    &record[0],
                    row + 1
                ))
            })?;
            entries.push(LabelEntry {
                label,
                name: record[1].trim().to_string(),
            });
        }

        if entries.is_empty() {
            return Err(RadiomicsError::InvalidFormat(
                "label table is empty".to_string(),
            ));
        }
        Ok(Self { entries })
    }
}

/// One region per non-background label with at least one voxel, in
/// table order.
pub fn regions_from_atlas(atlas: &Volume, labels: &LabelTable) -> Vec<Region> {
    labels
        .entries
        .iter()
        .filter(|entry| entry.label != 0)
        .filter_map(|entry| {
            if atlas.label_voxel_count(entry.label) == 0 {
                debug!(label = entry.label, name = %entry.name, "Label absent from atlas");
                return None;
            }
            Some(Region::from_label(&entry.name, atlas.label_mask(entry.label)))
        })
        .collect()
}

/// Turns a [`RegionSource`] into named regions.
#[derive(Clone)]
pub struct RegionSetBuilder {
    reader: Arc<dyn VolumeReader>,
}

impl RegionSetBuilder {
    /// `reader` loads atlas volumes; it must keep stored label values.
    pub fn new(reader: Arc<dyn VolumeReader>) -> Self {
        Self { reader }
    }

    pub fn build(&self, source: &RegionSource) -> Result<Vec<Region>> {
        match source {
            RegionSource::MaskFiles(paths) => Self::mask_file_regions(paths),
            RegionSource::Atlas { atlas, labels } => self.atlas_regions(atlas, labels),
        }
    }

    fn mask_file_regions(paths: &[PathBuf]) -> Result<Vec<Region>> {
        if paths.is_empty() {
            return Err(RadiomicsError::InvalidFormat(
                "no mask files given for region extraction".to_string(),
            ));
        }
        paths
            .iter()
            .map(|path| {
                ensure_exists(path)?;
                Ok(Region::from_file(path))
            })
            .collect()
    }

    fn atlas_regions(&self, atlas_path: &Path, labels_path: &Path) -> Result<Vec<Region>> {
        ensure_exists(atlas_path)?;
        ensure_exists(labels_path)?;

        let labels = LabelTable::load(labels_path)?;
        let atlas = self.reader.read(atlas_path)?;
        let regions = regions_from_atlas(&atlas, &labels);

        info!(
            regions = regions.len(),
            atlas = %atlas_path.display(),
            "Found atlas regions for radiomics extraction"
        );
        Ok(regions)
    }
}
