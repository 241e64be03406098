//! Index, size and region algebra for N-dimensional boxes.
//!
//! All types are parameterised by the dimension `D`. Axis 0 is the fastest
//! varying axis in memory, axis `D - 1` the slowest.

use std::fmt;
use std::ops::{Add, Sub};

/// Discrete pixel coordinate. Components may be negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Index<const D: usize>(pub [i64; D]);

/// Signed displacement between two indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Offset<const D: usize>(pub [i64; D]);

/// Extent of a region along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Size<const D: usize>(pub [usize; D]);

impl<const D: usize> Index<D> {
    pub const fn new(components: [i64; D]) -> Self {
        Self(components)
    }

    pub const fn zero() -> Self {
        Self([0; D])
    }

    pub const fn filled(value: i64) -> Self {
        Self([value; D])
    }
}

impl<const D: usize> Default for Index<D> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const D: usize> std::ops::Index<usize> for Index<D> {
    type Output = i64;

    fn index(&self, axis: usize) -> &i64 {
        &self.0[axis]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Index<D> {
    fn index_mut(&mut self, axis: usize) -> &mut i64 {
        &mut self.0[axis]
    }
}

impl<const D: usize> Add<Offset<D>> for Index<D> {
    type Output = Index<D>;

    fn add(self, rhs: Offset<D>) -> Index<D> {
        Index(std::array::from_fn(|d| self.0[d] + rhs.0[d]))
    }
}

impl<const D: usize> Sub<Offset<D>> for Index<D> {
    type Output = Index<D>;

    fn sub(self, rhs: Offset<D>) -> Index<D> {
        Index(std::array::from_fn(|d| self.0[d] - rhs.0[d]))
    }
}

impl<const D: usize> Sub for Index<D> {
    type Output = Offset<D>;

    fn sub(self, rhs: Index<D>) -> Offset<D> {
        Offset(std::array::from_fn(|d| self.0[d] - rhs.0[d]))
    }
}

impl<const D: usize> Offset<D> {
    pub const fn new(components: [i64; D]) -> Self {
        Self(components)
    }

    pub const fn zero() -> Self {
        Self([0; D])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&c| c == 0)
    }
}

impl<const D: usize> Default for Offset<D> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const D: usize> Size<D> {
    pub const fn new(components: [usize; D]) -> Self {
        Self(components)
    }

    pub const fn filled(value: usize) -> Self {
        Self([value; D])
    }

    /// Number of pixels in a box of this size, saturating at `usize::MAX`.
    pub fn product(&self) -> usize {
        self.checked_product().unwrap_or(usize::MAX)
    }

    /// Number of pixels, or `None` when it does not fit in `usize`.
    pub fn checked_product(&self) -> Option<usize> {
        if self.0.contains(&0) {
            return Some(0);
        }
        self.0.iter().try_fold(1usize, |acc, &s| acc.checked_mul(s))
    }
}

impl<const D: usize> Default for Size<D> {
    fn default() -> Self {
        Self([0; D])
    }
}

impl<const D: usize> std::ops::Index<usize> for Size<D> {
    type Output = usize;

    fn index(&self, axis: usize) -> &usize {
        &self.0[axis]
    }
}

/// Axis-aligned box of pixel coordinates, half open per axis:
/// `[index, index + size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region<const D: usize> {
    index: Index<D>,
    size: Size<D>,
}

/// Result of [`Region::crop`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cropped<const D: usize> {
    pub region: Region<D>,
    /// Set when the original region reached outside the bounds.
    pub clipped: bool,
}

impl<const D: usize> Region<D> {
    pub const fn new(index: Index<D>, size: Size<D>) -> Self {
        Self { index, size }
    }

    /// Region of the given size starting at index zero.
    pub const fn from_size(size: Size<D>) -> Self {
        Self {
            index: Index::zero(),
            size,
        }
    }

    pub fn index(&self) -> Index<D> {
        self.index
    }

    pub fn size(&self) -> Size<D> {
        self.size
    }

    /// Exclusive upper corner.
    pub fn upper_index(&self) -> Index<D> {
        Index(std::array::from_fn(|d| {
            self.index.0[d] + self.size.0[d] as i64
        }))
    }

    /// Saturates at `usize::MAX`; see [`Region::checked_number_of_pixels`].
    pub fn number_of_pixels(&self) -> usize {
        self.size.product()
    }

    pub fn checked_number_of_pixels(&self) -> Option<usize> {
        self.size.checked_product()
    }

    /// A region with any zero-sized axis contains no pixels.
    pub fn is_empty(&self) -> bool {
        self.size.0.iter().any(|&s| s == 0)
    }

    pub fn contains(&self, index: &Index<D>) -> bool {
        (0..D).all(|d| {
            let start = self.index.0[d];
            index.0[d] >= start && index.0[d] < start + self.size.0[d] as i64
        })
    }

    /// True iff `self` is fully contained in `outer`. Empty regions are
    /// inside everything.
    pub fn is_inside(&self, outer: &Region<D>) -> bool {
        if self.is_empty() {
            return true;
        }
        let lower = outer.index;
        let upper = outer.upper_index();
        let own_upper = self.upper_index();
        (0..D).all(|d| self.index.0[d] >= lower.0[d] && own_upper.0[d] <= upper.0[d])
    }

    /// Axis-wise overlap of two regions. Axes without overlap get size 0;
    /// check [`Region::is_empty`] before using the result.
    pub fn intersection(&self, other: &Region<D>) -> Region<D> {
        let a_upper = self.upper_index();
        let b_upper = other.upper_index();
        let mut index = [0i64; D];
        let mut size = [0usize; D];
        for d in 0..D {
            let start = self.index.0[d].max(other.index.0[d]);
            let end = a_upper.0[d].min(b_upper.0[d]);
            index[d] = start;
            size[d] = (end - start).max(0) as usize;
        }
        Region::new(Index(index), Size(size))
    }

    /// Bounds `self` to `bounds`, flagging whether anything was cut off.
    pub fn crop(&self, bounds: &Region<D>) -> Cropped<D> {
        if self.is_inside(bounds) {
            return Cropped {
                region: *self,
                clipped: false,
            };
        }
        Cropped {
            region: self.intersection(bounds),
            clipped: true,
        }
    }

    /// Enlarges the region by `radius[d]` on both sides of every axis.
    /// The result is not cropped to anything.
    pub fn pad(&self, radius: [usize; D]) -> Region<D> {
        let index = Index(std::array::from_fn(|d| self.index.0[d] - radius[d] as i64));
        let size = Size(std::array::from_fn(|d| self.size.0[d] + 2 * radius[d]));
        Region::new(index, size)
    }

    pub fn pad_uniform(&self, radius: usize) -> Region<D> {
        self.pad([radius; D])
    }

    /// Smallest region covering both operands. Empty operands contribute
    /// nothing.
    pub fn bounding_union(&self, other: &Region<D>) -> Region<D> {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        let a_upper = self.upper_index();
        let b_upper = other.upper_index();
        let mut index = [0i64; D];
        let mut size = [0usize; D];
        for d in 0..D {
            let start = self.index.0[d].min(other.index.0[d]);
            let end = a_upper.0[d].max(b_upper.0[d]);
            index[d] = start;
            size[d] = (end - start) as usize;
        }
        Region::new(Index(index), Size(size))
    }
}

impl<const D: usize> fmt::Display for Region<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{index: {:?}, size: {:?}}}", self.index.0, self.size.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region2(index: [i64; 2], size: [usize; 2]) -> Region<2> {
        Region::new(Index(index), Size(size))
    }

    #[test]
    fn intersection_of_overlapping_boxes() {
        let a = region2([0, 0], [10, 10]);
        let b = region2([5, -3], [10, 6]);
        assert_eq!(a.intersection(&b), region2([5, 0], [5, 3]));
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = region2([0, 0], [4, 4]);
        let b = region2([10, 0], [4, 4]);
        let overlap = a.intersection(&b);
        assert!(overlap.is_empty());
        assert_eq!(overlap.number_of_pixels(), 0);
    }

    #[test]
    fn pad_goes_negative_and_crop_flags_boundary() {
        let largest = region2([0, 0], [16, 16]);
        let padded = region2([0, 0], [4, 4]).pad_uniform(2);
        assert_eq!(padded, region2([-2, -2], [8, 8]));

        let cropped = padded.crop(&largest);
        assert!(cropped.clipped);
        assert_eq!(cropped.region, region2([0, 0], [6, 6]));

        let inner = region2([4, 4], [2, 2]).crop(&largest);
        assert!(!inner.clipped);
    }

    #[test]
    fn pixel_count_overflow_is_detected() {
        let huge = region2([0, 0], [1 << 40, 1 << 40]);
        assert_eq!(huge.checked_number_of_pixels(), None);
        assert_eq!(huge.number_of_pixels(), usize::MAX);
        let flat = region2([0, 0], [usize::MAX, 0]);
        assert_eq!(flat.checked_number_of_pixels(), Some(0));
        assert!(flat.is_empty());
    }

    #[test]
    fn containment() {
        let outer = region2([0, 0], [8, 8]);
        assert!(region2([2, 2], [6, 6]).is_inside(&outer));
        assert!(!region2([2, 2], [7, 6]).is_inside(&outer));
        assert!(region2([100, 100], [0, 5]).is_inside(&outer));
        assert!(outer.contains(&Index([7, 0])));
        assert!(!outer.contains(&Index([8, 0])));
        assert!(!outer.contains(&Index([-1, 3])));
    }

    #[test]
    fn bounding_union_ignores_empty_regions() {
        let a = region2([0, 0], [2, 2]);
        let b = region2([5, 1], [1, 4]);
        assert_eq!(a.bounding_union(&b), region2([0, 0], [6, 5]));
        assert_eq!(a.bounding_union(&region2([50, 50], [0, 0])), a);
    }
}
