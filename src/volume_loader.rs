use crate::{enums::SortBy, volume::Volume};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Array3, s};
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeReadError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}

/// Anything that can turn a path into a volume on the scan's voxel grid.
pub trait VolumeReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Volume, VolumeReadError>;
}

/// Reads DICOM data: a directory as a single-frame series, a file as a
/// multi-frame object.
#[derive(Clone, Copy, Debug, Default)]
pub struct DicomVolumeReader {
    sort_by: SortBy,
    stored_values: bool,
}

impl DicomVolumeReader {
    /// Intensity images, windowed through the first VOI LUT.
    pub fn scan(sort_by: SortBy) -> Self {
        Self {
            sort_by,
            stored_values: false,
        }
    }

    /// Masks and atlases; stored label values are kept untouched.
    pub fn labels(sort_by: SortBy) -> Self {
        Self {
            sort_by,
            stored_values: true,
        }
    }

    /// Load a volume from DICOM objects
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found or dimensions are inconsistent
    pub fn load_from_dicom_objects(
        &self,
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
    ) -> Result<Volume, VolumeReadError> {
        let mut images_with_order: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| self.extract_image_with_order(dicom_object))
            .collect();

        if images_with_order.is_empty() {
            return Err(VolumeReadError::NoValidImages);
        }

        Self::sort_images(&mut images_with_order, self.sort_by);

        let images: Vec<_> = images_with_order
            .into_iter()
            .map(|(_, image)| image)
            .collect();

        Self::validate_dimensions(&images)?;

        Ok(Volume::new(
            Self::build_volume_array(&images),
            Self::get_spacing(dicom_objects),
        ))
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(&self, path: impl AsRef<Path>) -> Result<Volume, VolumeReadError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeReadError::NoValidImages);
        }

        let objects: Result<Vec<_>, _> = paths.iter().map(open_file).collect();
        self.load_from_dicom_objects(&objects?)
    }

    /// Load every frame of a single multi-frame DICOM file
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<Volume, VolumeReadError> {
        let dicom_object = open_file(path.as_ref())?;
        let volume_array = dicom_object
            .decode_pixel_data()
            .ok()
            .and_then(|pixel_data| {
                pixel_data
                    .to_ndarray_with_options::<u16>(&self.convert_options())
                    .ok()
            })
            .map(|arr| arr.slice_move(s![.., .., .., 0]))
            .ok_or(VolumeReadError::NoValidImages)?;

        let spacing = Self::get_spacing(std::slice::from_ref(&dicom_object));
        Ok(Volume::new(volume_array, spacing))
    }

    fn convert_options(&self) -> ConvertOptions {
        if self.stored_values {
            ConvertOptions::new()
                .with_modality_lut(ModalityLutOption::None)
                .with_voi_lut(VoiLutOption::Identity)
        } else {
            ConvertOptions::new().with_voi_lut(VoiLutOption::First)
        }
    }

    fn extract_image_with_order(
        &self,
        dicom_object: &FileDicomObject<InMemDicomObject>,
    ) -> Option<(Option<f32>, Array2<u16>)> {
        let order = Self::get_sort_order(dicom_object, &self.sort_by)?;
        let image_2d = self.decode_image(dicom_object)?;
        Some((order, image_2d))
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    fn decode_image(&self, dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<u16>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        pixel_data
            .to_ndarray_with_options::<u16>(&self.convert_options())
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_images(images_with_order: &mut [(Option<f32>, Array2<u16>)], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            images_with_order
                .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        }

        if matches!(sort_by, SortBy::ImagePositionPatient) {
            images_with_order.reverse();
        }
    }

    fn validate_dimensions(images: &[Array2<u16>]) -> Result<(), VolumeReadError> {
        let first_dim = images[0].dim();
        if images.iter().any(|img| img.dim() != first_dim) {
            return Err(VolumeReadError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(images: &[Array2<u16>]) -> Array3<u16> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<u16>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        volume
    }

    fn get_spacing(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> Option<(f32, f32, f32)> {
        dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float32()
                .ok()?;

            let slice_thickness = dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()?
                .to_float32()
                .ok()?;

            Self::spacing_from(&pixel_spacing, slice_thickness)
        })
    }

    /// `(row, column, slice)` spacing; `None` unless PixelSpacing has two values.
    fn spacing_from(pixel_spacing: &[f32], slice_thickness: f32) -> Option<(f32, f32, f32)> {
        let row = *pixel_spacing.first()?;
        let column = *pixel_spacing.get(1)?;
        Some((row, column, slice_thickness))
    }
}

impl VolumeReader for DicomVolumeReader {
    fn read(&self, path: &Path) -> Result<Volume, VolumeReadError> {
        if path.is_dir() {
            self.load_from_directory(path)
        } else {
            self.load_from_file(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_without_dicom_files_has_no_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a slice").unwrap();

        let result = DicomVolumeReader::scan(SortBy::InstanceNumber).read(dir.path());
        assert!(matches!(result, Err(VolumeReadError::NoValidImages)));
    }

    #[test]
    fn slices_are_stacked_in_sorted_order() {
        let mut images = vec![
            (Some(2.0), Array2::<u16>::from_elem((2, 2), 2)),
            (Some(1.0), Array2::<u16>::from_elem((2, 2), 1)),
        ];
        DicomVolumeReader::sort_images(&mut images, SortBy::InstanceNumber);
        let stacked: Vec<_> = images.into_iter().map(|(_, image)| image).collect();
        let volume = DicomVolumeReader::build_volume_array(&stacked);

        assert_eq!(volume.dim(), (2, 2, 2));
        assert_eq!(volume[[0, 0, 0]], 1);
        assert_eq!(volume[[1, 1, 1]], 2);
    }

    #[test]
    fn mismatched_slices_are_rejected() {
        let images = vec![Array2::<u16>::zeros((2, 2)), Array2::<u16>::zeros((3, 2))];
        assert!(matches!(
            DicomVolumeReader::validate_dimensions(&images),
            Err(VolumeReadError::InconsistentDimensions)
        ));
    }

    #[test]
    fn short_pixel_spacing_gives_no_spacing() {
        assert_eq!(DicomVolumeReader::spacing_from(&[], 1.0), None);
        assert_eq!(DicomVolumeReader::spacing_from(&[0.5], 1.0), None);
        assert_eq!(
            DicomVolumeReader::spacing_from(&[0.5, 0.75], 1.2),
            Some((0.5, 0.75, 1.2))
        );
    }
}
