//! Mapping between N-dimensional indices and linear buffer offsets.

use crate::image::ImageError;
use crate::region::{Index, Offset, Region};

/// Strides of a buffer laid out over `region`, dimension 0 fastest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffsetTable<const D: usize> {
    region: Region<D>,
    strides: [usize; D],
    len: usize,
}

impl<const D: usize> OffsetTable<D> {
    pub fn new(region: Region<D>) -> Self {
        let size = region.size();
        let mut strides = [0usize; D];
        let mut stride = 1usize;
        for d in 0..D {
            strides[d] = stride;
            stride = stride.saturating_mul(size[d]);
        }
        Self {
            region,
            strides,
            len: region.number_of_pixels(),
        }
    }

    pub fn region(&self) -> &Region<D> {
        &self.region
    }

    pub fn strides(&self) -> &[usize; D] {
        &self.strides
    }

    /// Number of addressable pixels.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Linear offset of `index`, failing when it lies outside the region.
    pub fn offset(&self, index: &Index<D>) -> Result<usize, ImageError> {
        if !self.region.contains(index) {
            return Err(ImageError::IndexOutOfBounds {
                index: index.0.to_vec(),
                region: self.region.to_string(),
            });
        }
        Ok(self.offset_unchecked(index))
    }

    /// Linear offset of an index already known to be inside the region.
    #[inline]
    pub fn offset_unchecked(&self, index: &Index<D>) -> usize {
        debug_assert!(self.region.contains(index), "index outside buffered region");
        let start = self.region.index();
        let mut offset = 0usize;
        for d in 0..D {
            offset += (index.0[d] - start.0[d]) as usize * self.strides[d];
        }
        offset
    }

    /// Inverse of [`OffsetTable::offset`].
    pub fn index_of(&self, offset: usize) -> Result<Index<D>, ImageError> {
        if offset >= self.len {
            return Err(ImageError::OffsetOutOfBounds {
                offset,
                len: self.len,
            });
        }
        Ok(self.index_of_unchecked(offset))
    }

    #[inline]
    pub fn index_of_unchecked(&self, offset: usize) -> Index<D> {
        let start = self.region.index();
        let mut remainder = offset;
        let mut index = [0i64; D];
        for d in (0..D).rev() {
            let q = remainder / self.strides[d].max(1);
            remainder -= q * self.strides[d];
            index[d] = start.0[d] + q as i64;
        }
        Index(index)
    }

    /// Linear displacement corresponding to a relative offset.
    #[inline]
    pub fn offset_delta(&self, offset: &Offset<D>) -> isize {
        let mut delta = 0isize;
        for d in 0..D {
            delta += offset.0[d] as isize * self.strides[d] as isize;
        }
        delta
    }
}
