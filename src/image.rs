use crate::addressing::OffsetTable;
use crate::enums::BoundaryCondition;
use crate::iterator::{ImageRegionIterator, ImageRegionIteratorMut, ImageViewIteratorMut, RegionCursor};
use crate::neighborhood::NeighborhoodIterator;
use crate::region::{Index, Region, Size};
use crate::time_stamp::TimeStamp;

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use std::collections::TryReserveError;
use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("index {index:?} lies outside buffered region {region}")]
    IndexOutOfBounds { index: Vec<i64>, region: String },

    #[error("offset {offset} exceeds buffer length {len}")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("region {region} is not inside buffered region {buffered}")]
    RegionOutsideBuffer { region: String, buffered: String },

    #[error("neighborhood of radius {radius:?} around {region} leaves buffered region {buffered}")]
    NeighborhoodOutsideBuffer {
        radius: Vec<usize>,
        region: String,
        buffered: String,
    },

    #[error("buffer holds {actual} pixels but region {region} needs {expected}")]
    SizeMismatch {
        region: String,
        expected: usize,
        actual: usize,
    },

    #[error("expected a {expected}-dimensional array, got {actual} dimensions")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("failed to allocate {pixels} pixels: {source}")]
    Allocation {
        pixels: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("region {region} holds more pixels than fit in memory")]
    TooLarge { region: String },

    #[error("partition {region} overlaps another partition")]
    OverlappingPartitions { region: String },

    #[error("ndarray shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Value type stored in an image buffer.
pub trait Pixel: Copy + Default + PartialEq + PartialOrd + Send + Sync + Debug + 'static {
    fn to_f64(self) -> f64;

    /// Converts back, rounding and saturating for integer types.
    fn from_f64(value: f64) -> Self;
}

macro_rules! integer_pixel {
    ($($t:ty),*) => {
        $(
            impl Pixel for $t {
                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value.round() as $t
                }
            }
        )*
    };
}

macro_rules! float_pixel {
    ($($t:ty),*) => {
        $(
            impl Pixel for $t {
                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $t
                }
            }
        )*
    };
}

integer_pixel!(u8, i8, u16, i16, u32, i32, u64, i64);
float_pixel!(f32, f64);

/// Geometry of an image, propagated downstream without touching pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageInformation<const D: usize> {
    pub largest_possible_region: Region<D>,
    /// Physical coordinate of index zero.
    pub origin: [f64; D],
    /// Physical distance per index step along each axis.
    pub spacing: [f64; D],
    /// Row-major rotation from index axes to physical axes.
    pub direction: [[f64; D]; D],
}

impl<const D: usize> ImageInformation<D> {
    pub fn new(largest_possible_region: Region<D>) -> Self {
        Self {
            largest_possible_region,
            origin: [0.0; D],
            spacing: [1.0; D],
            direction: std::array::from_fn(|r| std::array::from_fn(|c| if r == c { 1.0 } else { 0.0 })),
        }
    }

    pub fn with_spacing(mut self, spacing: [f64; D]) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_origin(mut self, origin: [f64; D]) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_direction(mut self, direction: [[f64; D]; D]) -> Self {
        self.direction = direction;
        self
    }

    /// `origin + direction * (index * spacing)`
    pub fn index_to_physical_point(&self, index: &Index<D>) -> [f64; D] {
        let scaled: [f64; D] = std::array::from_fn(|d| index.0[d] as f64 * self.spacing[d]);
        std::array::from_fn(|r| {
            self.origin[r]
                + self.direction[r]
                    .iter()
                    .zip(scaled.iter())
                    .map(|(m, s)| m * s)
                    .sum::<f64>()
        })
    }
}

/// N-dimensional pixel buffer over a buffered region.
#[derive(Clone, Debug)]
pub struct Image<T, const D: usize> {
    information: ImageInformation<D>,
    requested_region: Region<D>,
    table: OffsetTable<D>,
    data: Vec<T>,
    time_stamp: TimeStamp,
}

impl<T: Pixel, const D: usize> Image<T, D> {
    /// Allocates a default-filled buffer over `buffered_region`.
    pub fn allocate(
        information: ImageInformation<D>,
        buffered_region: Region<D>,
    ) -> Result<Self, ImageError> {
        Self::filled(information, buffered_region, T::default())
    }

    pub fn filled(
        information: ImageInformation<D>,
        buffered_region: Region<D>,
        value: T,
    ) -> Result<Self, ImageError> {
        let pixels = buffered_region
            .checked_number_of_pixels()
            .ok_or_else(|| ImageError::TooLarge {
                region: buffered_region.to_string(),
            })?;
        let mut data = Vec::new();
        data.try_reserve_exact(pixels)
            .map_err(|source| ImageError::Allocation { pixels, source })?;
        data.resize(pixels, value);
        Ok(Self::from_parts(information, buffered_region, data))
    }

    /// Wraps an existing buffer laid out over `buffered_region`.
    pub fn from_vec(
        information: ImageInformation<D>,
        buffered_region: Region<D>,
        data: Vec<T>,
    ) -> Result<Self, ImageError> {
        let expected = buffered_region.number_of_pixels();
        if data.len() != expected {
            return Err(ImageError::SizeMismatch {
                region: buffered_region.to_string(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self::from_parts(information, buffered_region, data))
    }

    /// Image whose buffered and largest possible regions are `region`, with
    /// each pixel computed from its index.
    pub fn from_fn(region: Region<D>, mut f: impl FnMut(Index<D>) -> T) -> Result<Self, ImageError> {
        let mut image = Self::allocate(ImageInformation::new(region), region)?;
        image.region_iter_mut(&region)?.for_each_pixel(|index, value| *value = f(index));
        Ok(image)
    }

    fn from_parts(information: ImageInformation<D>, buffered_region: Region<D>, data: Vec<T>) -> Self {
        Self {
            information,
            requested_region: buffered_region,
            table: OffsetTable::new(buffered_region),
            data,
            time_stamp: TimeStamp::now(),
        }
    }

    pub fn information(&self) -> &ImageInformation<D> {
        &self.information
    }

    pub fn largest_possible_region(&self) -> &Region<D> {
        &self.information.largest_possible_region
    }

    pub fn buffered_region(&self) -> &Region<D> {
        self.table.region()
    }

    pub fn requested_region(&self) -> &Region<D> {
        &self.requested_region
    }

    pub fn set_requested_region(&mut self, region: Region<D>) {
        self.requested_region = region;
    }

    pub fn spacing(&self) -> &[f64; D] {
        &self.information.spacing
    }

    pub fn origin(&self) -> &[f64; D] {
        &self.information.origin
    }

    pub fn direction(&self) -> &[[f64; D]; D] {
        &self.information.direction
    }

    pub fn offset_table(&self) -> &OffsetTable<D> {
        &self.table
    }

    pub fn time_stamp(&self) -> TimeStamp {
        self.time_stamp
    }

    /// Marks the pixel content as changed.
    pub fn modified(&mut self) {
        self.time_stamp.modified();
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn pixel(&self, index: &Index<D>) -> Result<T, ImageError> {
        Ok(self.data[self.table.offset(index)?])
    }

    pub fn set_pixel(&mut self, index: &Index<D>, value: T) -> Result<(), ImageError> {
        let offset = self.table.offset(index)?;
        self.data[offset] = value;
        Ok(())
    }

    fn check_inside(&self, region: &Region<D>) -> Result<(), ImageError> {
        if region.is_inside(self.buffered_region()) {
            Ok(())
        } else {
            Err(ImageError::RegionOutsideBuffer {
                region: region.to_string(),
                buffered: self.buffered_region().to_string(),
            })
        }
    }

    pub fn region_iter(&self, region: &Region<D>) -> Result<ImageRegionIterator<'_, T, D>, ImageError> {
        self.check_inside(region)?;
        Ok(ImageRegionIterator::new(&self.data, &self.table, *region))
    }

    pub fn region_iter_mut(
        &mut self,
        region: &Region<D>,
    ) -> Result<ImageRegionIteratorMut<'_, T, D>, ImageError> {
        self.check_inside(region)?;
        Ok(ImageRegionIteratorMut::new(&mut self.data, &self.table, *region))
    }

    pub fn neighborhood_iter(
        &self,
        radius: [usize; D],
        region: &Region<D>,
        boundary: BoundaryCondition,
    ) -> Result<NeighborhoodIterator<'_, T, D>, ImageError> {
        self.check_inside(region)?;
        NeighborhoodIterator::new(&self.data, &self.table, radius, *region, boundary)
    }

    /// Splits the buffer into one writable view per region, in the order
    /// given. The regions must lie inside the buffered region and must not
    /// overlap; the views can then be filled from different threads.
    pub fn partition_views(&mut self, partitions: &[Region<D>]) -> Result<Vec<ImageViewMut<'_, T, D>>, ImageError> {
        for region in partitions {
            self.check_inside(region)?;
        }
        let information = self.information;
        let buffered = *self.buffered_region();
        let mut views: Vec<ImageViewMut<'_, T, D>> = partitions
            .iter()
            .map(|region| ImageViewMut {
                information,
                buffered_region: buffered,
                table: OffsetTable::new(*region),
                rows: Vec::with_capacity(region.number_of_pixels() / region.size()[0].max(1)),
            })
            .collect();
        if buffered.is_empty() {
            return Ok(views);
        }

        // Walk the buffer row by row and hand each covering partition its
        // segment, left to right.
        let (row_starts, row_len) = rows_of(&buffered);
        let mut cursor = RegionCursor::new(&self.table, row_starts);
        let mut covering = Vec::with_capacity(partitions.len());
        for mut row in self.data.chunks_mut(row_len) {
            let start = cursor.index();
            covering.clear();
            covering.extend((0..partitions.len()).filter(|&p| covers_row(&partitions[p], &start)));
            covering.sort_by_key(|&p| partitions[p].index()[0]);
            let mut x = buffered.index()[0];
            for &p in &covering {
                let region = &partitions[p];
                let skip = region.index()[0] - x;
                if skip < 0 {
                    return Err(ImageError::OverlappingPartitions {
                        region: region.to_string(),
                    });
                }
                let (_, rest) = std::mem::take(&mut row).split_at_mut(skip as usize);
                let (segment, rest) = rest.split_at_mut(region.size()[0]);
                views[p].rows.push(segment);
                row = rest;
                x = region.index()[0] + region.size()[0] as i64;
            }
            cursor.advance();
        }
        Ok(views)
    }

    /// Buffered pixels as an `ndarray` array. Axes are reversed so that
    /// axis 0 of the image is the last (contiguous) array axis, e.g. a 3-D
    /// image `[x, y, z]` becomes an array of shape `(z, y, x)`.
    pub fn to_ndarray(&self) -> Result<ArrayD<T>, ImageError> {
        let size = self.buffered_region().size();
        let shape: Vec<usize> = size.0.iter().rev().copied().collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), self.data.clone())?)
    }

    /// Builds an image from an array laid out as produced by
    /// [`Image::to_ndarray`]. The buffered and largest possible regions
    /// start at index zero.
    pub fn from_ndarray(array: ArrayViewD<'_, T>) -> Result<Self, ImageError> {
        if array.ndim() != D {
            return Err(ImageError::DimensionMismatch {
                expected: D,
                actual: array.ndim(),
            });
        }
        let shape = array.shape();
        let size = Size(std::array::from_fn(|d| shape[D - 1 - d]));
        let region = Region::from_size(size);
        let data: Vec<T> = array.iter().copied().collect();
        Self::from_vec(ImageInformation::new(region), region, data)
    }
}

/// Region of the first pixel of every row of `region`, and the row length.
fn rows_of<const D: usize>(region: &Region<D>) -> (Region<D>, usize) {
    let mut rows = region.size();
    rows.0[0] = 1;
    (Region::new(region.index(), rows), region.size()[0])
}

/// Whether the non-empty `region` holds the row starting at `start`.
fn covers_row<const D: usize>(region: &Region<D>, start: &Index<D>) -> bool {
    let upper = region.upper_index();
    !region.is_empty() && (1..D).all(|d| region.index()[d] <= start[d] && start[d] < upper[d])
}

/// Writable part of an [`Image`] restricted to one region.
///
/// Obtained from [`Image::partition_views`]; pixels outside the view's
/// region are not reachable through it.
#[derive(Debug)]
pub struct ImageViewMut<'a, T, const D: usize> {
    information: ImageInformation<D>,
    buffered_region: Region<D>,
    table: OffsetTable<D>,
    rows: Vec<&'a mut [T]>,
}

impl<'a, T: Pixel, const D: usize> ImageViewMut<'a, T, D> {
    pub fn information(&self) -> &ImageInformation<D> {
        &self.information
    }

    pub fn largest_possible_region(&self) -> &Region<D> {
        &self.information.largest_possible_region
    }

    /// Buffered region of the image the view was taken from.
    pub fn buffered_region(&self) -> &Region<D> {
        &self.buffered_region
    }

    /// The writable region.
    pub fn region(&self) -> &Region<D> {
        self.table.region()
    }

    fn check_inside(&self, region: &Region<D>) -> Result<(), ImageError> {
        if region.is_inside(self.region()) {
            Ok(())
        } else {
            Err(ImageError::RegionOutsideBuffer {
                region: region.to_string(),
                buffered: self.region().to_string(),
            })
        }
    }

    pub fn pixel(&self, index: &Index<D>) -> Result<T, ImageError> {
        let offset = self.table.offset(index)?;
        let row_len = self.region().size()[0];
        Ok(self.rows[offset / row_len][offset % row_len])
    }

    pub fn set_pixel(&mut self, index: &Index<D>, value: T) -> Result<(), ImageError> {
        let offset = self.table.offset(index)?;
        let row_len = self.region().size()[0];
        self.rows[offset / row_len][offset % row_len] = value;
        Ok(())
    }

    pub fn region_iter_mut(
        &mut self,
        region: &Region<D>,
    ) -> Result<ImageViewIteratorMut<'_, 'a, T, D>, ImageError> {
        self.check_inside(region)?;
        Ok(ImageViewIteratorMut::new(&mut self.rows, &self.table, *region))
    }

    /// Copies `region` from `source`. The region must lie inside this view
    /// and inside the source's buffered region.
    pub fn copy_region_from(&mut self, source: &Image<T, D>, region: &Region<D>) -> Result<(), ImageError> {
        self.check_inside(region)?;
        source.check_inside(region)?;
        if region.is_empty() {
            return Ok(());
        }
        let (row_starts, len) = rows_of(region);
        let row_len = self.region().size()[0];
        let mut src = RegionCursor::new(&source.table, row_starts);
        let mut dst = RegionCursor::new(&self.table, row_starts);
        while !src.is_at_end() {
            let (s, d) = (src.offset(), dst.offset());
            let x = d % row_len;
            self.rows[d / row_len][x..x + len].copy_from_slice(&source.data[s..s + len]);
            src.advance();
            dst.advance();
        }
        Ok(())
    }
}
