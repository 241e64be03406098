//! Windowed iteration: a fixed-radius box of neighbors around a moving
//! center, with a selectable boundary condition.

use crate::addressing::OffsetTable;
use crate::enums::BoundaryCondition;
use crate::image::ImageError;
use crate::iterator::RegionCursor;
use crate::region::{Index, Offset, Region, Size};

/// Neighborhood iterator over a region of a buffer.
///
/// Window positions are numbered with axis 0 varying fastest, so position
/// `len() / 2` is the center. All positions start out active.
#[derive(Clone, Debug)]
pub struct NeighborhoodIterator<'a, T, const D: usize> {
    data: &'a [T],
    table: OffsetTable<D>,
    cursor: RegionCursor<D>,
    radius: [usize; D],
    offsets: Vec<Offset<D>>,
    deltas: Vec<isize>,
    active: Vec<usize>,
    boundary: BoundaryCondition,
    interior: Region<D>,
}

impl<'a, T: Copy, const D: usize> NeighborhoodIterator<'a, T, D> {
    pub(crate) fn new(
        data: &'a [T],
        table: &OffsetTable<D>,
        radius: [usize; D],
        region: Region<D>,
        boundary: BoundaryCondition,
    ) -> Result<Self, ImageError> {
        let buffered = *table.region();
        if boundary == BoundaryCondition::None && !region.pad(radius).is_inside(&buffered) {
            return Err(ImageError::NeighborhoodOutsideBuffer {
                radius: radius.to_vec(),
                region: region.to_string(),
                buffered: buffered.to_string(),
            });
        }

        let window: Size<D> = Size(std::array::from_fn(|d| 2 * radius[d] + 1));
        let mut offsets = Vec::with_capacity(window.product());
        for position in 0..window.product() {
            let mut rest = position;
            let mut offset = [0i64; D];
            for d in 0..D {
                offset[d] = (rest % window[d]) as i64 - radius[d] as i64;
                rest /= window[d];
            }
            offsets.push(Offset(offset));
        }
        let deltas = offsets.iter().map(|o| table.offset_delta(o)).collect();
        let active = (0..offsets.len()).collect();

        // Centers inside this box see their whole window in the buffer.
        let start = buffered.index();
        let size = buffered.size();
        let interior = Region::new(
            Index(std::array::from_fn(|d| start.0[d] + radius[d] as i64)),
            Size(std::array::from_fn(|d| size[d].saturating_sub(2 * radius[d]))),
        );

        Ok(Self {
            data,
            table: *table,
            cursor: RegionCursor::new(table, region),
            radius,
            offsets,
            deltas,
            active,
            boundary,
            interior,
        })
    }

    pub fn radius(&self) -> &[usize; D] {
        &self.radius
    }

    pub fn boundary_condition(&self) -> BoundaryCondition {
        self.boundary
    }

    /// Number of window positions.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn center_position(&self) -> usize {
        self.offsets.len() / 2
    }

    pub fn offset_at(&self, position: usize) -> Offset<D> {
        self.offsets[position]
    }

    /// Window position of a relative offset, if it lies within the radius.
    pub fn position_of(&self, offset: &Offset<D>) -> Option<usize> {
        let mut position = 0usize;
        let mut stride = 1usize;
        for d in 0..D {
            let r = self.radius[d] as i64;
            if offset.0[d] < -r || offset.0[d] > r {
                return None;
            }
            position += (offset.0[d] + r) as usize * stride;
            stride *= 2 * self.radius[d] + 1;
        }
        Some(position)
    }

    /// Center index.
    pub fn index(&self) -> Index<D> {
        self.cursor.index()
    }

    /// True when every window position of the current center lies inside
    /// the buffered region.
    #[inline]
    pub fn is_in_bounds(&self) -> bool {
        self.interior.contains(&self.cursor.index())
    }

    #[inline]
    pub fn center_value(&self) -> T {
        self.data[self.cursor.offset()]
    }

    /// Value at a window position, resolved through the boundary condition
    /// when it falls outside the buffer.
    #[inline]
    pub fn get(&self, position: usize) -> T {
        if self.is_in_bounds() {
            let at = self.cursor.offset() as isize + self.deltas[position];
            return self.data[at as usize];
        }
        let index = self.resolve(self.cursor.index() + self.offsets[position]);
        self.data[self.table.offset_unchecked(&index)]
    }

    pub fn get_offset(&self, offset: &Offset<D>) -> Option<T> {
        self.position_of(offset).map(|position| self.get(position))
    }

    /// All window values in position order.
    pub fn values(&self) -> Vec<T> {
        (0..self.offsets.len()).map(|p| self.get(p)).collect()
    }

    pub fn active_values(&self) -> impl Iterator<Item = T> + '_ {
        self.active.iter().map(|&p| self.get(p))
    }

    pub fn active_offsets(&self) -> impl Iterator<Item = Offset<D>> + '_ {
        self.active.iter().map(|&p| self.offsets[p])
    }

    pub fn deactivate_all(&mut self) {
        self.active.clear();
    }

    /// Returns false when the offset lies outside the radius.
    pub fn activate_offset(&mut self, offset: &Offset<D>) -> bool {
        let Some(position) = self.position_of(offset) else {
            return false;
        };
        if let Err(slot) = self.active.binary_search(&position) {
            self.active.insert(slot, position);
        }
        true
    }

    pub fn deactivate_offset(&mut self, offset: &Offset<D>) {
        if let Some(position) = self.position_of(offset) {
            if let Ok(slot) = self.active.binary_search(&position) {
                self.active.remove(slot);
            }
        }
    }

    /// Restricts the active set to the face neighbors (one step along a
    /// single axis). The center is left out; use [`Self::center_value`].
    pub fn activate_face_connected(&mut self) {
        self.deactivate_all();
        for d in 0..D {
            if self.radius[d] == 0 {
                continue;
            }
            for step in [-1i64, 1] {
                let mut offset = Offset::zero();
                offset.0[d] = step;
                self.activate_offset(&offset);
            }
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor.is_at_end()
    }

    pub fn advance(&mut self) {
        self.cursor.advance();
    }

    pub fn go_to_begin(&mut self) {
        self.cursor.go_to_begin();
    }

    fn resolve(&self, mut index: Index<D>) -> Index<D> {
        let buffered = self.table.region();
        let start = buffered.index();
        let size = buffered.size();
        for d in 0..D {
            let lo = start.0[d];
            let len = size[d] as i64;
            let v = index.0[d];
            if v >= lo && v < lo + len {
                continue;
            }
            index.0[d] = match self.boundary {
                BoundaryCondition::Periodic => lo + (v - lo).rem_euclid(len),
                // `None` never gets here: construction rejects windows that
                // leave the buffer.
                BoundaryCondition::ZeroFluxNeumann | BoundaryCondition::None => v.clamp(lo, lo + len - 1),
            };
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Image, ImageInformation};

    fn line(values: &[i32]) -> Image<i32, 1> {
        let region = Region::from_size(Size([values.len()]));
        Image::from_vec(ImageInformation::new(region), region, values.to_vec()).unwrap()
    }

    #[test]
    fn zero_flux_repeats_edge_pixel() {
        let image = line(&[1, 2, 3, 4, 5]);
        let region = Region::new(Index([0]), Size([1]));
        let it = image
            .neighborhood_iter([1], &region, BoundaryCondition::ZeroFluxNeumann)
            .unwrap();
        assert!(!it.is_in_bounds());
        assert_eq!(it.values(), vec![1, 1, 2]);
    }

    #[test]
    fn periodic_wraps_around() {
        let image = line(&[1, 2, 3, 4, 5]);
        let region = Region::new(Index([0]), Size([1]));
        let it = image
            .neighborhood_iter([1], &region, BoundaryCondition::Periodic)
            .unwrap();
        assert_eq!(it.values(), vec![5, 1, 2]);

        let last = Region::new(Index([4]), Size([1]));
        let it = image.neighborhood_iter([2], &last, BoundaryCondition::Periodic).unwrap();
        assert_eq!(it.values(), vec![3, 4, 5, 1, 2]);
    }

    #[test]
    fn no_extension_requires_interior_region() {
        let image = line(&[1, 2, 3, 4, 5]);
        let whole = Region::from_size(Size([5]));
        assert!(matches!(
            image.neighborhood_iter([1], &whole, BoundaryCondition::None),
            Err(ImageError::NeighborhoodOutsideBuffer { .. })
        ));
        let inner = Region::new(Index([1]), Size([3]));
        let mut it = image.neighborhood_iter([1], &inner, BoundaryCondition::None).unwrap();
        let mut windows = Vec::new();
        while !it.is_at_end() {
            assert!(it.is_in_bounds());
            windows.push(it.values());
            it.advance();
        }
        assert_eq!(windows, vec![vec![1, 2, 3], vec![2, 3, 4], vec![3, 4, 5]]);
    }

    #[test]
    fn fast_path_agrees_with_boundary_path() {
        let region = Region::from_size(Size([6, 5]));
        let image = Image::<i32, 2>::from_fn(region, |i| (i[0] + 10 * i[1]) as i32).unwrap();
        let mut it = image
            .neighborhood_iter([1, 1], &region, BoundaryCondition::ZeroFluxNeumann)
            .unwrap();
        while !it.is_at_end() {
            let center = it.index();
            for p in 0..it.len() {
                let n = center + it.offset_at(p);
                let clamped = Index([n[0].clamp(0, 5), n[1].clamp(0, 4)]);
                assert_eq!(it.get(p), image.pixel(&clamped).unwrap());
            }
            it.advance();
        }
    }

    #[test]
    fn sparse_activation_skips_unused_neighbors() {
        let region = Region::from_size(Size([3, 3]));
        let image = Image::<i32, 2>::from_fn(region, |i| (i[0] + 3 * i[1]) as i32).unwrap();
        let center = Region::new(Index([1, 1]), Size([1, 1]));
        let mut it = image
            .neighborhood_iter([1, 1], &center, BoundaryCondition::ZeroFluxNeumann)
            .unwrap();
        assert_eq!(it.len(), 9);
        assert_eq!(it.center_position(), 4);
        assert_eq!(it.center_value(), 4);

        it.activate_face_connected();
        let mut values: Vec<i32> = it.active_values().collect();
        values.sort();
        assert_eq!(values, vec![1, 3, 5, 7]);
        assert!(it.active_offsets().all(|o| !o.is_zero()));

        it.deactivate_offset(&Offset([0, -1]));
        assert_eq!(it.active_values().count(), 3);
        assert!(!it.activate_offset(&Offset([2, 0])));
        assert_eq!(it.get_offset(&Offset([1, 1])), Some(8));
        assert_eq!(it.get_offset(&Offset([0, 2])), None);
    }
}
