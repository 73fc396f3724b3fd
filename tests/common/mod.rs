#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::{Array3, Zip};
use radiomics_core::volume_loader::VolumeReadError;
use radiomics_core::{
    BackendError, FeatureBackend, FeatureMap, Mask, Region, Verbosity, Volume, VolumeReader,
};

pub const DIM: (usize, usize, usize) = (4, 5, 6);

/// Deterministic backend: voxel count and mean intensity of the mask, plus
/// bookkeeping entries the crate must filter out.
#[derive(Default)]
pub struct ScriptedBackend {
    fail_on_voxel_count: Option<usize>,
    calls: Mutex<Vec<Verbosity>>,
}

impl ScriptedBackend {
    pub fn failing_on(voxel_count: usize) -> Self {
        Self {
            fail_on_voxel_count: Some(voxel_count),
            ..Self::default()
        }
    }

    pub fn verbosities(&self) -> Vec<Verbosity> {
        self.calls.lock().unwrap().clone()
    }
}

impl FeatureBackend for ScriptedBackend {
    fn compute(
        &self,
        volume: &Volume,
        mask: &Mask,
        verbosity: Verbosity,
    ) -> Result<FeatureMap, BackendError> {
        self.calls.lock().unwrap().push(verbosity);
        let count = mask.voxel_count();
        if self.fail_on_voxel_count == Some(count) {
            return Err(format!("cannot compute texture for {count} voxels").into());
        }
        let mut sum = 0.0;
        Zip::from(&volume.data).and(&mask.data).for_each(|&v, &m| {
            if m {
                sum += f64::from(v);
            }
        });
        Ok(vec![
            ("diagnostics_Mask-original_VoxelNum".into(), count as f64),
            ("general_info_Version".into(), 3.0),
            ("original_shape_VoxelVolume".into(), count as f64),
            ("original_firstorder_Mean".into(), sum / count as f64),
            ("wavelet-LLH_firstorder_Mean".into(), 0.0),
        ])
    }
}

/// Volumes served from memory, keyed by path.
#[derive(Default)]
pub struct MemoryReader {
    volumes: Mutex<HashMap<PathBuf, Volume>>,
}

impl MemoryReader {
    pub fn insert(&self, path: &Path, volume: Volume) {
        self.volumes
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), volume);
    }
}

impl VolumeReader for MemoryReader {
    fn read(&self, path: &Path) -> Result<Volume, VolumeReadError> {
        self.volumes
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or(VolumeReadError::NoValidImages)
    }
}

pub fn scan() -> Volume {
    let data = Array3::from_shape_fn(DIM, |(z, y, x)| (z * 100 + y * 10 + x) as u16);
    Volume::new(data, Some((1.0, 1.0, 1.0)))
}

/// Mask selecting the first `voxels` voxels in memory order.
pub fn mask(voxels: usize) -> Mask {
    let mut data = Array3::from_elem(DIM, false);
    data.iter_mut().take(voxels).for_each(|v| *v = true);
    Mask::new(data)
}

pub fn label_region(name: &str, voxels: usize) -> Region {
    Region::from_label(name, mask(voxels))
}

/// Atlas whose label `i + 1` covers `counts[i]` consecutive voxels.
pub fn atlas(counts: &[usize]) -> Volume {
    let mut data = Array3::<u16>::zeros(DIM);
    let mut cells = data.iter_mut();
    for (i, &count) in counts.iter().enumerate() {
        for cell in cells.by_ref().take(count) {
            *cell = (i + 1) as u16;
        }
    }
    Volume::new(data, None)
}

/// Mask volume stored under `dir/name` and registered with `reader`.
pub fn mask_file(reader: &MemoryReader, dir: &Path, name: &str, voxels: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"placeholder").unwrap();
    let data = mask(voxels).data.mapv(u16::from);
    reader.insert(&path, Volume::new(data, None));
    path
}
