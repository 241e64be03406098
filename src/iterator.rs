//! Cursors over a region of an image buffer.
//!
//! A [`RegionCursor`] keeps the current index and the matching linear offset
//! in step. Moving along axis 0 is a single increment; when an axis wraps it
//! is reset to the region start and the carry moves into the next axis by
//! its precomputed stride, so stepping never recomputes a full offset.

use crate::addressing::OffsetTable;
use crate::region::{Index, Region};

#[derive(Clone, Debug)]
pub struct RegionCursor<const D: usize> {
    region: Region<D>,
    upper: Index<D>,
    strides: [usize; D],
    begin_offset: usize,
    index: Index<D>,
    offset: usize,
    position: usize,
    at_end: bool,
}

impl<const D: usize> RegionCursor<D> {
    /// `region` must lie inside the table's region; callers check this.
    pub fn new(table: &OffsetTable<D>, region: Region<D>) -> Self {
        let begin_offset = if region.is_empty() {
            0
        } else {
            table.offset_unchecked(&region.index())
        };
        Self {
            region,
            upper: region.upper_index(),
            strides: *table.strides(),
            begin_offset,
            index: region.index(),
            offset: begin_offset,
            position: 0,
            at_end: region.is_empty(),
        }
    }

    pub fn region(&self) -> &Region<D> {
        &self.region
    }

    pub fn index(&self) -> Index<D> {
        self.index
    }

    /// Linear offset of the current position in the underlying buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_at_end(&self) -> bool {
        self.at_end
    }

    /// Number of positions not yet visited, the current one included.
    pub fn remaining(&self) -> usize {
        if self.at_end {
            0
        } else {
            self.region.number_of_pixels() - self.position
        }
    }

    pub fn go_to_begin(&mut self) {
        self.index = self.region.index();
        self.offset = self.begin_offset;
        self.position = 0;
        self.at_end = self.region.is_empty();
    }

    /// Moves to the last position of the region.
    pub fn go_to_reverse_begin(&mut self) {
        if self.region.is_empty() {
            self.at_end = true;
            return;
        }
        let size = self.region.size();
        let mut offset = self.begin_offset;
        for d in 0..D {
            self.index.0[d] = self.upper.0[d] - 1;
            offset += (size[d] - 1) * self.strides[d];
        }
        self.offset = offset;
        self.position = self.region.number_of_pixels() - 1;
        self.at_end = false;
    }

    #[inline]
    pub fn advance(&mut self) {
        if self.at_end {
            return;
        }
        self.position += 1;
        let start = self.region.index();
        let size = self.region.size();
        for d in 0..D {
            self.index.0[d] += 1;
            self.offset += self.strides[d];
            if self.index.0[d] < self.upper.0[d] {
                return;
            }
            self.index.0[d] = start.0[d];
            self.offset -= size[d] * self.strides[d];
        }
        self.at_end = true;
    }

    /// Steps one position backwards. Stepping before the first position
    /// ends the traversal.
    #[inline]
    pub fn retreat(&mut self) {
        if self.at_end {
            return;
        }
        let start = self.region.index();
        let size = self.region.size();
        for d in 0..D {
            if self.index.0[d] > start.0[d] {
                self.index.0[d] -= 1;
                self.offset -= self.strides[d];
                self.position -= 1;
                return;
            }
            self.index.0[d] = self.upper.0[d] - 1;
            self.offset += (size[d] - 1) * self.strides[d];
        }
        self.at_end = true;
    }
}

/// Read-only traversal of a region, yielding `(index, value)` pairs.
#[derive(Clone, Debug)]
pub struct ImageRegionIterator<'a, T, const D: usize> {
    data: &'a [T],
    cursor: RegionCursor<D>,
}

impl<'a, T: Copy, const D: usize> ImageRegionIterator<'a, T, D> {
    pub(crate) fn new(data: &'a [T], table: &OffsetTable<D>, region: Region<D>) -> Self {
        Self {
            data,
            cursor: RegionCursor::new(table, region),
        }
    }

    /// Value at the current position. Must not be called at the end.
    #[inline]
    pub fn get(&self) -> T {
        self.data[self.cursor.offset()]
    }

    pub fn index(&self) -> Index<D> {
        self.cursor.index()
    }

    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor.is_at_end()
    }

    pub fn advance(&mut self) {
        self.cursor.advance();
    }

    pub fn retreat(&mut self) {
        self.cursor.retreat();
    }

    pub fn go_to_begin(&mut self) {
        self.cursor.go_to_begin();
    }

    pub fn go_to_reverse_begin(&mut self) {
        self.cursor.go_to_reverse_begin();
    }

    pub fn region(&self) -> &Region<D> {
        self.cursor.region()
    }
}

impl<T: Copy, const D: usize> Iterator for ImageRegionIterator<'_, T, D> {
    type Item = (Index<D>, T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_at_end() {
            return None;
        }
        let item = (self.cursor.index(), self.data[self.cursor.offset()]);
        self.cursor.advance();
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.cursor.remaining();
        (remaining, Some(remaining))
    }
}

impl<T: Copy, const D: usize> ExactSizeIterator for ImageRegionIterator<'_, T, D> {}

/// Read-write traversal of a region.
#[derive(Debug)]
pub struct ImageRegionIteratorMut<'a, T, const D: usize> {
    data: &'a mut [T],
    cursor: RegionCursor<D>,
}

impl<'a, T: Copy, const D: usize> ImageRegionIteratorMut<'a, T, D> {
    pub(crate) fn new(data: &'a mut [T], table: &OffsetTable<D>, region: Region<D>) -> Self {
        Self {
            data,
            cursor: RegionCursor::new(table, region),
        }
    }

    #[inline]
    pub fn get(&self) -> T {
        self.data[self.cursor.offset()]
    }

    #[inline]
    pub fn set(&mut self, value: T) {
        self.data[self.cursor.offset()] = value;
    }

    #[inline]
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.data[self.cursor.offset()]
    }

    pub fn index(&self) -> Index<D> {
        self.cursor.index()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor.is_at_end()
    }

    pub fn advance(&mut self) {
        self.cursor.advance();
    }

    pub fn retreat(&mut self) {
        self.cursor.retreat();
    }

    pub fn go_to_begin(&mut self) {
        self.cursor.go_to_begin();
    }

    pub fn go_to_reverse_begin(&mut self) {
        self.cursor.go_to_reverse_begin();
    }

    /// Visits every remaining position in order.
    pub fn for_each_pixel(mut self, mut f: impl FnMut(Index<D>, &mut T)) {
        while !self.cursor.is_at_end() {
            let index = self.cursor.index();
            f(index, &mut self.data[self.cursor.offset()]);
            self.cursor.advance();
        }
    }
}

/// Read-write traversal of a region through the row segments of an
/// [`ImageViewMut`](crate::image::ImageViewMut).
#[derive(Debug)]
pub struct ImageViewIteratorMut<'v, 'a, T, const D: usize> {
    rows: &'v mut [&'a mut [T]],
    row_len: usize,
    cursor: RegionCursor<D>,
}

impl<'v, 'a, T: Copy, const D: usize> ImageViewIteratorMut<'v, 'a, T, D> {
    /// `rows` hold the rows of `table`'s region in order.
    pub(crate) fn new(rows: &'v mut [&'a mut [T]], table: &OffsetTable<D>, region: Region<D>) -> Self {
        Self {
            rows,
            row_len: table.region().size()[0].max(1),
            cursor: RegionCursor::new(table, region),
        }
    }

    #[inline]
    fn slot(&mut self) -> &mut T {
        let offset = self.cursor.offset();
        &mut self.rows[offset / self.row_len][offset % self.row_len]
    }

    #[inline]
    pub fn get(&self) -> T {
        let offset = self.cursor.offset();
        self.rows[offset / self.row_len][offset % self.row_len]
    }

    #[inline]
    pub fn set(&mut self, value: T) {
        *self.slot() = value;
    }

    #[inline]
    pub fn value_mut(&mut self) -> &mut T {
        self.slot()
    }

    pub fn index(&self) -> Index<D> {
        self.cursor.index()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor.is_at_end()
    }

    pub fn advance(&mut self) {
        self.cursor.advance();
    }

    pub fn retreat(&mut self) {
        self.cursor.retreat();
    }

    pub fn go_to_begin(&mut self) {
        self.cursor.go_to_begin();
    }

    pub fn go_to_reverse_begin(&mut self) {
        self.cursor.go_to_reverse_begin();
    }

    /// Visits every remaining position in order.
    pub fn for_each_pixel(mut self, mut f: impl FnMut(Index<D>, &mut T)) {
        while !self.cursor.is_at_end() {
            let index = self.cursor.index();
            f(index, self.slot());
            self.cursor.advance();
        }
    }
}
