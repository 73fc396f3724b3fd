mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{MemoryReader, atlas};
use proptest::prelude::*;
use radiomics_core::region::regions_from_atlas;
use radiomics_core::{LabelTable, RadiomicsError, RegionMask, RegionSetBuilder, RegionSource};

fn label_csv(labels: &[(i64, &str)]) -> String {
    labels
        .iter()
        .map(|(label, name)| format!("{label},{name}\n"))
        .collect()
}

#[test]
fn atlas_source_reads_labels_and_atlas() {
    let dir = tempfile::tempdir().unwrap();
    let atlas_path = dir.path().join("registered_atlas.dcm");
    let labels_path = dir.path().join("atlas_anat_labels.csv");
    std::fs::write(&atlas_path, b"placeholder").unwrap();
    std::fs::write(
        &labels_path,
        label_csv(&[(2, "Right Putamen"), (1, "Left/Putamen"), (0, "Background"), (3, "Unused")]),
    )
    .unwrap();

    let reader = Arc::new(MemoryReader::default());
    reader.insert(&atlas_path, atlas(&[4, 6]));

    let regions = RegionSetBuilder::new(reader)
        .build(&RegionSource::Atlas {
            atlas: atlas_path,
            labels: labels_path,
        })
        .unwrap();

    let names: Vec<_> = regions.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Right Putamen", "Left_Putamen"]);
}

#[test]
fn wrongly_shaped_label_table_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let atlas_path = dir.path().join("atlas.dcm");
    let labels_path = dir.path().join("labels.csv");
    std::fs::write(&atlas_path, b"placeholder").unwrap();
    std::fs::write(&labels_path, "1,Left,cortical\n2,Right,cortical\n").unwrap();

    let result = RegionSetBuilder::new(Arc::new(MemoryReader::default())).build(
        &RegionSource::Atlas {
            atlas: atlas_path,
            labels: labels_path,
        },
    );
    assert!(matches!(result, Err(RadiomicsError::InvalidFormat(_))));
}

#[test]
fn missing_atlas_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let labels_path = dir.path().join("labels.csv");
    std::fs::write(&labels_path, "1,Left\n").unwrap();

    let result = RegionSetBuilder::new(Arc::new(MemoryReader::default())).build(
        &RegionSource::Atlas {
            atlas: dir.path().join("atlas.dcm"),
            labels: labels_path,
        },
    );
    assert!(matches!(result, Err(RadiomicsError::NotFound(_))));
}

#[test]
fn mask_files_become_regions_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let reader = MemoryReader::default();
    let first = common::mask_file(&reader, dir.path(), "hippocampus.dcm", 3);
    let second = common::mask_file(&reader, dir.path(), "amygdala.dcm", 3);

    let regions = RegionSetBuilder::new(Arc::new(reader))
        .build(&RegionSource::MaskFiles(vec![first.clone(), second]))
        .unwrap();

    assert_eq!(regions[0].name, "hippocampus");
    assert_eq!(regions[1].name, "amygdala");
    assert!(matches!(&regions[0].mask, RegionMask::File(path) if *path == first));
}

#[test]
fn missing_mask_file_is_not_found() {
    let result = RegionSetBuilder::new(Arc::new(MemoryReader::default()))
        .build(&RegionSource::MaskFiles(vec![PathBuf::from("/nonexistent/roi.dcm")]));
    assert!(matches!(result, Err(RadiomicsError::NotFound(_))));
}

#[test]
fn empty_mask_list_is_invalid() {
    let result = RegionSetBuilder::new(Arc::new(MemoryReader::default()))
        .build(&RegionSource::MaskFiles(Vec::new()));
    assert!(matches!(result, Err(RadiomicsError::InvalidFormat(_))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn one_region_per_present_label(counts in prop::collection::vec(0usize..12, 1..6)) {
        let volume = atlas(&counts);
        let mut labels = vec![(0, "Background".to_string())];
        labels.extend((1..=counts.len() as i64).map(|label| (label, format!("region {label}"))));
        let table = LabelTable::from_reader(
            labels
                .iter()
                .map(|(label, name)| format!("{label},{name}\n"))
                .collect::<String>()
                .as_bytes(),
        )
        .unwrap();

        let regions = regions_from_atlas(&volume, &table);
        let present: Vec<(usize, usize)> = counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(i, count)| (i + 1, *count))
            .collect();

        prop_assert_eq!(regions.len(), present.len());
        for (region, (label, count)) in regions.iter().zip(present) {
            prop_assert_eq!(&region.name, &format!("region {label}"));
            match &region.mask {
                RegionMask::Labelled(mask) => prop_assert_eq!(mask.voxel_count(), count),
                RegionMask::File(_) => prop_assert!(false, "atlas regions are labelled"),
            }
        }
    }
}
