//! # Radiomics core
//!
//! This crate computes radiomic features for the anatomical regions of a
//! 3-D scan and assembles them, together with the scan's acquisition
//! metadata, into one table per scan.
//!
//! Regions come either from explicit mask volumes or from an atlas label
//! volume plus a headerless `Label,Name` table. Each region is extracted
//! on a bounded worker pool (at most eight at once); a region that fails
//! only loses its own row. The rows of every pass (brain mask, atlas
//! regions, ad-hoc ROIs) are then merged into a single table with the
//! columns
//!
//!  - `Image`, `Source`, `region_name`
//!  - every metadata field, repeated on each row
//!  - every `original*` feature column
//!
//! The feature values themselves come from a [`FeatureBackend`]
//! implementation supplied by the caller. Volumes are read through a
//! [`VolumeReader`]; [`DicomVolumeReader`] reads DICOM series and
//! multi-frame files.
//!
//! # Examples
//!
//! ## Extracting atlas regions and merging with metadata
//!
//! ```no_run
//! # use radiomics_core::{ExtractionConfig, RadiomicsPipeline, RegionSource, ScanJob};
//! # use radiomics_core::backend::FeatureBackend;
//! # use std::path::PathBuf;
//! # use std::sync::Arc;
//! # fn backend() -> Arc<dyn FeatureBackend> { unimplemented!() }
//! let pipeline = RadiomicsPipeline::new(ExtractionConfig::default(), backend());
//! let outcome = pipeline
//!     .run(&ScanJob {
//!         image: PathBuf::from("dicom/sub-01"),
//!         output_dir: PathBuf::from("out"),
//!         brain_mask: Some(PathBuf::from("out/brain_mask.dcm")),
//!         regions: RegionSource::Atlas {
//!             atlas: PathBuf::from("out/registered_atlas.dcm"),
//!             labels: PathBuf::from("atlas/atlas_anat_labels.csv"),
//!         },
//!         metadata: Some(PathBuf::from("out/extracted_metadata.json")),
//!         keep_intermediate: false,
//!     })
//!     .expect("should have extracted and merged radiomics");
//! println!("{} rows written to {}", outcome.merged.table().len(), outcome.output.display());
//! ```

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod enums;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod merger;
pub mod metadata;
pub mod pipeline;
pub mod region;
pub mod table;
pub mod volume;
pub mod volume_loader;

pub use backend::{BackendError, FeatureBackend, FeatureMap};
pub use config::ExtractionConfig;
pub use coordinator::ExtractionCoordinator;
pub use enums::{ExecutorKind, RegionOrigin, SortBy, SourceTag, Verbosity};
pub use error::{RadiomicsError, Result};
pub use extractor::{FeatureRecord, RegionExtractor};
pub use merger::{MergedResult, ResultMerger, SourcedTable};
pub use metadata::MetadataRecord;
pub use pipeline::{PipelineOutcome, RadiomicsPipeline, ScanJob};
pub use region::{LabelTable, Region, RegionMask, RegionSetBuilder, RegionSource};
pub use table::{FeatureTable, Scalar, TableAssembler};
pub use volume::{Mask, Volume};
pub use volume_loader::{DicomVolumeReader, VolumeReader};
