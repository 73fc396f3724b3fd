use ndarray::Array3;
use ndarray::Zip;
use ndarray::parallel::prelude::*;

/// A scan or label volume in (depth, height, width) order.
#[derive(Clone, Debug, Default)]
pub struct Volume {
    pub data: Array3<u16>,
    pub spacing: Option<(f32, f32, f32)>,
}

impl Volume {
    pub fn new(data: Array3<u16>, spacing: Option<(f32, f32, f32)>) -> Self {
        Self { data, spacing }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<u16> {
        &self.data
    }

    /// Number of voxels carrying exactly `label`.
    pub fn label_voxel_count(&self, label: i64) -> usize {
        self.data
            .par_iter()
            .filter(|&&v| i64::from(v) == label)
            .count()
    }

    /// Boolean mask of the voxels carrying `label`.
    pub fn label_mask(&self, label: i64) -> Mask {
        Mask::new(Zip::from(&self.data).par_map_collect(|&v| i64::from(v) == label))
    }
}

/// Binary region mask sharing the voxel grid of the scan it was built for.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    pub data: Array3<bool>,
}

impl Mask {
    pub fn new(data: Array3<bool>) -> Self {
        Self { data }
    }

    /// Every non-zero voxel of `volume` becomes part of the mask.
    pub fn from_volume(volume: &Volume) -> Self {
        Self::new(Zip::from(&volume.data).par_map_collect(|&v| v != 0))
    }

    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn voxel_count(&self) -> usize {
        self.data.par_iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }
}
