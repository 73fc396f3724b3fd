use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::FeatureBackend;
use crate::config::ExtractionConfig;
use crate::coordinator::ExtractionCoordinator;
use crate::enums::{SortBy, SourceTag};
use crate::error::{Result, ensure_exists};
use crate::extractor::RegionExtractor;
use crate::merger::{MergedResult, ResultMerger, SourcedTable};
use crate::metadata::MetadataRecord;
use crate::region::{Region, RegionSetBuilder, RegionSource};
use crate::table::{FeatureTable, TableAssembler};
use crate::volume::Volume;
use crate::volume_loader::{DicomVolumeReader, VolumeReader};

/// Everything needed to process one scan.
#[derive(Clone, Debug)]
pub struct ScanJob {
    pub image: PathBuf,
    pub output_dir: PathBuf,
    pub brain_mask: Option<PathBuf>,
    pub regions: RegionSource,
    pub metadata: Option<PathBuf>,
    pub keep_intermediate: bool,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub merged: MergedResult,
    pub output: PathBuf,
}

/// Name of a scan with its `.nii`, `.nii.gz` or `.dcm` extension removed.
pub fn image_name(path: &Path) -> String {
    let mut name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    for suffix in [".gz", ".nii", ".dcm"] {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped.to_string();
        }
    }
    name
}

/// Runs every extraction pass for a scan and merges the results.
pub struct RadiomicsPipeline {
    config: ExtractionConfig,
    backend: Arc<dyn FeatureBackend>,
    scan_reader: Arc<dyn VolumeReader>,
    label_reader: Arc<dyn VolumeReader>,
}

impl RadiomicsPipeline {
    /// Pipeline reading DICOM scans, masks and atlases.
    pub fn new(config: ExtractionConfig, backend: Arc<dyn FeatureBackend>) -> Self {
        Self::with_readers(
            config,
            backend,
            Arc::new(DicomVolumeReader::scan(SortBy::default())),
            Arc::new(DicomVolumeReader::labels(SortBy::default())),
        )
    }

    /// `label_reader` loads masks and atlases and must keep stored values.
    pub fn with_readers(
        config: ExtractionConfig,
        backend: Arc<dyn FeatureBackend>,
        scan_reader: Arc<dyn VolumeReader>,
        label_reader: Arc<dyn VolumeReader>,
    ) -> Self {
        Self {
            config,
            backend,
            scan_reader,
            label_reader,
        }
    }

    fn coordinator(&self) -> ExtractionCoordinator {
        let extractor = RegionExtractor::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.label_reader),
            self.config.feature_prefix.clone(),
            self.config.verbosity,
        );
        ExtractionCoordinator::new(extractor)
            .with_max_workers(self.config.max_workers)
            .with_executor(self.config.executor)
    }

    pub fn run(&self, job: &ScanJob) -> Result<PipelineOutcome> {
        self.config.validate()?;
        ensure_exists(&job.image)?;
        std::fs::create_dir_all(&job.output_dir)?;

        let metadata = match &job.metadata {
            Some(path) => Some(MetadataRecord::load(path)?),
            None => {
                warn!(image = %job.image.display(), "No metadata record, merging without metadata columns");
                None
            }
        };

        let builder = RegionSetBuilder::new(Arc::clone(&self.label_reader));
        let mut passes = Vec::new();
        if let Some(brain_mask) = &job.brain_mask {
            passes.push((
                SourceTag::BrainMask,
                builder.build(&RegionSource::MaskFiles(vec![brain_mask.clone()]))?,
            ));
        }
        let region_tag = match job.regions {
            RegionSource::Atlas { .. } => SourceTag::Atlas,
            RegionSource::MaskFiles(_) => SourceTag::InputRoi,
        };
        passes.push((region_tag, builder.build(&job.regions)?));

        let volume = Arc::new(self.scan_reader.read(&job.image)?);

        let name = image_name(&job.image);
        let output = job.output_dir.join(format!("{name}_results.csv"));
        let mut intermediate = Vec::new();
        let merged = self
            .run_passes(job, passes, &volume, &mut intermediate)
            .and_then(|tables| {
                ResultMerger::new(self.config.feature_prefix.clone()).merge(
                    &tables,
                    metadata.as_ref(),
                    &name,
                )
            });

        let cleanup = if job.keep_intermediate {
            Ok(())
        } else {
            remove_intermediate(&intermediate)
        };

        let merged = merged?;
        cleanup?;
        merged.write(&output)?;
        info!(path = %output.display(), rows = merged.table().len(), "Pipeline completed");
        Ok(PipelineOutcome { merged, output })
    }

    /// Runs each pass in order and persists its table. Paths of written
    /// tables are pushed to `intermediate` as they appear, so the caller can
    /// remove them even when a later pass fails.
    fn run_passes(
        &self,
        job: &ScanJob,
        passes: Vec<(SourceTag, Vec<Region>)>,
        volume: &Arc<Volume>,
        intermediate: &mut Vec<PathBuf>,
    ) -> Result<Vec<SourcedTable>> {
        let coordinator = self.coordinator();
        let assembler = TableAssembler::new(self.config.excluded_prefixes.clone());

        let mut tables = Vec::new();
        for (source, regions) in passes {
            let path = job
                .output_dir
                .join(format!("{}.csv", source.table_stem()));
            let table = self.run_pass(&coordinator, &assembler, volume, source, regions)?;
            if assembler.persist(&table, &path)? {
                intermediate.push(path);
                tables.push(SourcedTable::new(source, table));
            }
        }
        Ok(tables)
    }

    fn run_pass(
        &self,
        coordinator: &ExtractionCoordinator,
        assembler: &TableAssembler,
        volume: &Arc<Volume>,
        source: SourceTag,
        regions: Vec<Region>,
    ) -> Result<FeatureTable> {
        info!(source = source.as_str(), regions = regions.len(), "Running extraction pass");
        let records = coordinator.run_batch(Arc::clone(volume), regions)?;
        Ok(assembler.assemble(&records))
    }
}

/// Removes every path, carrying on past failures; the first one is returned.
fn remove_intermediate(paths: &[PathBuf]) -> Result<()> {
    let mut first_error = None;
    for path in paths {
        if let Err(err) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %err, "Failed to remove intermediate table");
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_names_drop_volume_extensions() {
        assert_eq!(image_name(Path::new("/in/sub-01_T1w.nii.gz")), "sub-01_T1w");
        assert_eq!(image_name(Path::new("scan.nii")), "scan");
        assert_eq!(image_name(Path::new("series.dcm")), "series");
        assert_eq!(image_name(Path::new("/in/dicom_dir")), "dicom_dir");
    }
}
