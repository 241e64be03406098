use crate::enums::SortBy;
use crate::image::{Image, ImageError, ImageInformation, ImageViewMut, Pixel};
use crate::pipeline::{FilterError, GenerateContext, ImageFilter};
use crate::region::Region;

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use log::{debug, info};
use ndarray::{Array2, Array3, s};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),
}

/// Reads a DICOM series into a 3-D image indexed `[column, row, slice]`.
///
/// Only the first frame of each file is used. Files that cannot be decoded
/// or lack the sort key are skipped.
pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a volume from DICOM objects
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found, dimensions are inconsistent
    /// or no object carries pixel spacing and slice thickness
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Image<u16, 3>, VolumeLoaderError> {
        let mut images_with_order: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::extract_image_with_order(dicom_object, sort_by))
            .collect();

        if images_with_order.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }
        if images_with_order.len() < dicom_objects.len() {
            debug!(
                "skipped {} of {} DICOM objects without decodable pixel data or sort key",
                dicom_objects.len() - images_with_order.len(),
                dicom_objects.len()
            );
        }

        Self::sort_images(&mut images_with_order, sort_by);

        let images: Vec<_> = images_with_order.into_iter().map(|(_, image)| image).collect();

        Self::validate_dimensions(&images)?;

        let volume_array = Self::build_volume_array(&images);
        let (row_spacing, column_spacing, slice_thickness) =
            Self::get_spacing(dicom_objects).ok_or(VolumeLoaderError::MissingSpacing)?;

        // (slice, row, column) arrays map onto [column, row, slice] indices.
        let image = Image::from_ndarray(volume_array.view().into_dyn())?;
        let information = image.information().with_spacing([
            f64::from(column_spacing),
            f64::from(row_spacing),
            f64::from(slice_thickness),
        ]);
        let region = *image.buffered_region();
        info!("loaded DICOM volume {region}");
        Ok(Image::from_vec(information, region, image.into_vec())?)
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path>],
        sort_by: SortBy,
    ) -> Result<Image<u16, 3>, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> = paths.iter().map(|path| open_file(path.as_ref())).collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Image<u16, 3>, VolumeLoaderError> {
        let paths = Self::dicom_paths(path.as_ref())?;
        Self::load_from_file_paths(&paths, sort_by)
    }

    fn dicom_paths(directory: &Path) -> Result<Vec<PathBuf>, VolumeLoaderError> {
        let mut paths: Vec<_> = fs::read_dir(directory)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }
        paths.sort();
        Ok(paths)
    }

    fn extract_image_with_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Option<(Option<f32>, Array2<u16>)> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let image_2d = Self::decode_image(dicom_object)?;
        Some((order, image_2d))
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
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
                let pos = dicom_object.element(tags::TABLE_POSITION).ok()?.to_float32().ok();
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

    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<u16>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
        pixel_data
            .to_ndarray_with_options::<u16>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_images(images_with_order: &mut [(Option<f32>, Array2<u16>)], sort_by: SortBy) {
        if sort_by != SortBy::None {
            images_with_order.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        }

        if sort_by == SortBy::ImagePositionPatient {
            images_with_order.reverse();
        }
    }

    fn validate_dimensions(images: &[Array2<u16>]) -> Result<(), VolumeLoaderError> {
        let first_dim = images[0].dim();
        if images.iter().any(|img| img.dim() != first_dim) {
            return Err(VolumeLoaderError::InconsistentDimensions);
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

    /// `(row spacing, column spacing, slice thickness)` of the first object
    /// carrying all three.
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

            Some((*pixel_spacing.first()?, *pixel_spacing.get(1)?, slice_thickness))
        })
    }
}

/// Pipeline source stage serving a DICOM series.
///
/// The series is read when the source is opened or reloaded, not during
/// pipeline updates. Pixels are converted from `u16` to the pipeline's
/// pixel type.
#[derive(Debug)]
pub struct DicomSeriesSource {
    directory: Option<PathBuf>,
    sort_by: SortBy,
    volume: Arc<Image<u16, 3>>,
}

impl DicomSeriesSource {
    pub fn open(directory: impl Into<PathBuf>, sort_by: SortBy) -> Result<Self, VolumeLoaderError> {
        let directory = directory.into();
        let volume = VolumeLoader::load_from_directory(&directory, sort_by)?;
        Ok(Self {
            directory: Some(directory),
            sort_by,
            volume: Arc::new(volume),
        })
    }

    /// Wraps a volume that was already loaded.
    pub fn from_volume(volume: Image<u16, 3>) -> Self {
        Self {
            directory: None,
            sort_by: SortBy::default(),
            volume: Arc::new(volume),
        }
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn volume(&self) -> &Arc<Image<u16, 3>> {
        &self.volume
    }

    /// Re-reads the series from its directory, possibly with another
    /// slice order. Use through
    /// [`Pipeline::configure`](crate::pipeline::Pipeline::configure).
    pub fn reload(&mut self, sort_by: SortBy) -> Result<(), VolumeLoaderError> {
        let Some(directory) = &self.directory else {
            return Err(VolumeLoaderError::NoValidImages);
        };
        self.volume = Arc::new(VolumeLoader::load_from_directory(directory, sort_by)?);
        self.sort_by = sort_by;
        Ok(())
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }
}

impl<T: Pixel> ImageFilter<T, 3> for DicomSeriesSource {
    fn number_of_inputs(&self) -> usize {
        0
    }

    fn generate_output_information(
        &self,
        _inputs: &[ImageInformation<3>],
    ) -> Result<ImageInformation<3>, FilterError> {
        Ok(*self.volume.information())
    }

    fn generate(
        &self,
        ctx: &GenerateContext<'_, T, 3>,
        region: &Region<3>,
        outputs: &mut [ImageViewMut<'_, T, 3>],
    ) -> Result<(), FilterError> {
        let mut out = outputs[0].region_iter_mut(region)?;
        let mut slice = None;
        for (index, value) in self.volume.region_iter(region)? {
            if slice != Some(index[2]) {
                ctx.check_abort()?;
                slice = Some(index[2]);
            }
            out.set(T::from_f64(f64::from(value)));
            out.advance();
        }
        Ok(())
    }
}
