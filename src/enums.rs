use serde::Deserialize;

/// Slice ordering used when a DICOM series is stacked into a volume.
#[derive(Clone, Copy, Debug, Default)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

/// Which extraction pass produced a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceTag {
    BrainMask,
    Atlas,
    InputRoi,
}

impl SourceTag {
    /// Column value written to the `Source` field of the merged table.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::BrainMask => "brain_mask",
            SourceTag::Atlas => "atlas",
            SourceTag::InputRoi => "input_roi",
        }
    }

    /// Tag inferred from an intermediate table's file stem.
    ///
    /// Only used for tables arriving from untagged files; unknown stems
    /// fall back to [`SourceTag::InputRoi`].
    pub fn from_table_stem(stem: &str) -> Self {
        match stem {
            "brain_radiomics" => SourceTag::BrainMask,
            "radiomics_features" => SourceTag::Atlas,
            _ => SourceTag::InputRoi,
        }
    }

    /// File stem a pass with this tag persists its table under.
    pub fn table_stem(&self) -> &'static str {
        match self {
            SourceTag::BrainMask => "brain_radiomics",
            SourceTag::Atlas => "radiomics_features",
            SourceTag::InputRoi => "roi_radiomics",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionOrigin {
    File,
    AtlasLabel,
}

/// Logging level requested from the feature backend for one call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    Silent,
    Normal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    #[default]
    Rayon,
    Tokio,
}
