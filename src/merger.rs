use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::enums::SourceTag;
use crate::error::{RadiomicsError, Result};
use crate::metadata::MetadataRecord;
use crate::table::{Cell, FeatureTable, REGION_NAME_COLUMN, Scalar};

pub const IMAGE_COLUMN: &str = "Image";
pub const SOURCE_COLUMN: &str = "Source";

const MANDATORY_COLUMNS: [&str; 3] = [IMAGE_COLUMN, SOURCE_COLUMN, REGION_NAME_COLUMN];

/// A pass's table together with the pass that produced it.
#[derive(Clone, Debug)]
pub struct SourcedTable {
    pub source: SourceTag,
    pub table: FeatureTable,
}

impl SourcedTable {
    pub fn new(source: SourceTag, table: FeatureTable) -> Self {
        Self { source, table }
    }

    /// Read an untagged table, inferring its source from the file stem.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        Ok(Self::new(
            SourceTag::from_table_stem(&stem),
            FeatureTable::read_csv(path)?,
        ))
    }
}

/// Final per-scan table: `Image, Source, region_name`, metadata, features.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedResult {
    table: FeatureTable,
}

impl MergedResult {
    pub fn table(&self) -> &FeatureTable {
        &self.table
    }

    pub fn into_table(self) -> FeatureTable {
        self.table
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        self.table.write_csv(path)
    }
}

#[derive(Clone, Debug)]
pub struct ResultMerger {
    feature_prefix: String,
}

impl Default for ResultMerger {
    fn default() -> Self {
        Self::new("original")
    }
}

impl ResultMerger {
    pub fn new(feature_prefix: impl Into<String>) -> Self {
        Self {
            feature_prefix: feature_prefix.into(),
        }
    }

    /// Concatenate `tables`, stamp image and source on every row and
    /// broadcast `metadata` onto all of them.
    ///
    /// Without metadata no metadata columns are emitted. A feature column
    /// sharing a metadata field's name takes the metadata value.
    pub fn merge(
        &self,
        tables: &[SourcedTable],
        metadata: Option<&MetadataRecord>,
        image_name: &str,
    ) -> Result<MergedResult> {
        if tables.is_empty() {
            return Err(RadiomicsError::InvalidFormat(
                "no intermediate radiomics tables to merge".to_string(),
            ));
        }

        let metadata_fields: Vec<&(String, Cell)> = metadata
            .map(|record| {
                record
                    .fields()
                    .iter()
                    .filter(|(name, _)| !MANDATORY_COLUMNS.contains(&name.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        let mut columns: Vec<String> = MANDATORY_COLUMNS.iter().map(|c| c.to_string()).collect();
        for (name, _) in &metadata_fields {
            if !columns.contains(name) {
                columns.push(name.clone());
            }
        }
        for sourced in tables {
            for name in sourced.table.columns() {
                if name.starts_with(&self.feature_prefix) && !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }

        let mut merged = FeatureTable::new(columns);
        for sourced in tables {
            for row in sourced.table.iter_rows() {
                let stamped = [
                    (IMAGE_COLUMN.to_string(), Some(Scalar::Text(image_name.to_string()))),
                    (
                        SOURCE_COLUMN.to_string(),
                        Some(Scalar::Text(sourced.source.as_str().to_string())),
                    ),
                ];
                let cells = row
                    .filter(|(name, _)| {
                        *name == REGION_NAME_COLUMN || name.starts_with(&self.feature_prefix)
                    })
                    .map(|(name, value)| (name.to_string(), value.clone()));
                let broadcast = metadata_fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()));
                merged.push_row(stamped.into_iter().chain(cells).chain(broadcast));
            }
            debug!(
                source = sourced.source.as_str(),
                rows = sourced.table.len(),
                "Merged intermediate table"
            );
        }

        Ok(MergedResult { table: merged })
    }

    /// Merge every `*.csv` in `table_dir` (except `output`) and write the
    /// result to `output`.
    ///
    /// Sources are inferred from file stems; files are read in name order.
    /// Intermediate files are left in place.
    pub fn merge_directory(
        &self,
        table_dir: &Path,
        metadata: Option<&MetadataRecord>,
        image_name: &str,
        output: &Path,
    ) -> Result<MergedResult> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(table_dir)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .filter(|path| path.file_name() != output.file_name() || path.parent() != output.parent())
            .collect();
        paths.sort();

        let tables = paths
            .iter()
            .map(|path| SourcedTable::from_csv(path))
            .collect::<Result<Vec<_>>>()?;

        let merged = self.merge(&tables, metadata, image_name)?;
        merged.write(output)?;
        info!(
            rows = merged.table.len(),
            path = %output.display(),
            "Combined radiomics features saved"
        );
        Ok(merged)
    }
}
