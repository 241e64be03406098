//! 2-D slice export of 3-D images.

use crate::enums::Orientation;
use crate::image::{Image, ImageError, Pixel};
use crate::region::{Region, Size};

use image::{ImageBuffer, Luma};
use rayon::prelude::*;

pub type SliceImage = ImageBuffer<Luma<u8>, Vec<u8>>;

/// Axis held fixed by `orientation` on an `[x, y, z]` volume.
pub fn slice_axis(orientation: Orientation) -> usize {
    match orientation {
        Orientation::Axial => 2,
        Orientation::Coronal => 1,
        Orientation::Sagittal => 0,
    }
}

/// Number of slices of the buffered region along `orientation`.
pub fn slice_count<T: Pixel>(volume: &Image<T, 3>, orientation: Orientation) -> usize {
    volume.buffered_region().size()[slice_axis(orientation)]
}

/// Region of slice `index` (counted from the start of the buffered region).
pub fn slice_region<T: Pixel>(
    volume: &Image<T, 3>,
    index: usize,
    orientation: Orientation,
) -> Result<Region<3>, ImageError> {
    let buffered = *volume.buffered_region();
    let axis = slice_axis(orientation);
    let mut start = buffered.index();
    start[axis] += index as i64;
    if index >= buffered.size()[axis] {
        return Err(ImageError::IndexOutOfBounds {
            index: start.0.to_vec(),
            region: buffered.to_string(),
        });
    }
    let mut size = buffered.size().0;
    size[axis] = 1;
    Ok(Region::new(start, Size(size)))
}

/// Grey-scale picture of one slice, stretched to the slice's own
/// intensity range.
///
/// Axial slices are `x` by `y`, coronal `x` by `z`, sagittal `y` by `z`
/// (width by height).
pub fn extract_slice<T: Pixel>(
    volume: &Image<T, 3>,
    index: usize,
    orientation: Orientation,
) -> Result<SliceImage, ImageError> {
    let region = slice_region(volume, index, orientation)?;
    let values: Vec<f64> = volume.region_iter(&region)?.map(|(_, v)| v.to_f64()).collect();

    let size = region.size();
    let (width, height) = match orientation {
        Orientation::Axial => (size[0], size[1]),
        Orientation::Coronal => (size[0], size[2]),
        Orientation::Sagittal => (size[1], size[2]),
    };

    let (min, max) = values
        .par_iter()
        .fold(
            || (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), &v| (min.min(v), max.max(v)),
        )
        .reduce(
            || (f64::INFINITY, f64::NEG_INFINITY),
            |a, b| (a.0.min(b.0), a.1.max(b.1)),
        );
    let pixel_data: Vec<u8> = values
        .par_iter()
        .map(|&v| normalize_to_u8(v, min, max))
        .collect();

    let expected = width * height;
    ImageBuffer::from_raw(width as u32, height as u32, pixel_data).ok_or(ImageError::SizeMismatch {
        region: region.to_string(),
        expected,
        actual: values.len(),
    })
}

#[inline]
fn normalize_to_u8(value: f64, min: f64, max: f64) -> u8 {
    if max > min {
        ((value - min) / (max - min) * 255.0).round().clamp(0.0, 255.0) as u8
    } else {
        0
    }
}

/// Index of the middle slice along `orientation`.
pub fn center_slice<T: Pixel>(volume: &Image<T, 3>, orientation: Orientation) -> usize {
    slice_count(volume, orientation) / 2
}
