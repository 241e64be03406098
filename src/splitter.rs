//! Partitioning of an output region into disjoint per-worker pieces.

use crate::region::{Index, Region, Size};
use serde::{Deserialize, Serialize};

/// Which axes a region may be cut along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Cut only the slowest axis with more than one pixel.
    SlowestAxis,
    /// Cut the slowest axis first and move on to faster axes while more
    /// pieces are wanted than the slower axes can provide.
    #[default]
    Multidimensional,
}

/// How many pieces to ask the splitter for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionPolicy {
    /// `workers * n` pieces. Values above one help balance uneven work.
    PerWorker(usize),
    /// Exactly `n` pieces, regardless of the pool size.
    Fixed(usize),
}

impl Default for PartitionPolicy {
    fn default() -> Self {
        PartitionPolicy::PerWorker(1)
    }
}

impl PartitionPolicy {
    pub fn pieces(&self, workers: usize) -> usize {
        match *self {
            PartitionPolicy::PerWorker(n) => workers.saturating_mul(n).max(1),
            PartitionPolicy::Fixed(n) => n.max(1),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RegionSplitter {
    strategy: SplitStrategy,
}

impl RegionSplitter {
    pub fn new(strategy: SplitStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SplitStrategy {
        self.strategy
    }

    /// Splits `region` into at most `pieces` pairwise disjoint regions whose
    /// union is `region`. An empty region yields no pieces.
    pub fn split<const D: usize>(&self, region: &Region<D>, pieces: usize) -> Vec<Region<D>> {
        if region.is_empty() {
            return Vec::new();
        }
        let splits = self.splits_per_axis(&region.size(), pieces.max(1));

        let mut parts = vec![*region];
        for d in (0..D).rev() {
            if splits[d] <= 1 {
                continue;
            }
            parts = parts
                .iter()
                .flat_map(|part| chunk_axis(part, d, splits[d]))
                .collect();
        }
        parts
    }

    fn splits_per_axis<const D: usize>(&self, size: &Size<D>, pieces: usize) -> [usize; D] {
        let mut splits = [1usize; D];
        let mut remaining = pieces;
        for d in (0..D).rev() {
            if remaining <= 1 {
                break;
            }
            if size[d] <= 1 {
                continue;
            }
            let n = size[d].min(remaining);
            splits[d] = n;
            match self.strategy {
                SplitStrategy::SlowestAxis => break,
                SplitStrategy::Multidimensional => remaining /= n,
            }
        }
        splits
    }
}

/// Cuts `region` along `axis` into `count` slabs whose sizes differ by at
/// most one.
fn chunk_axis<const D: usize>(region: &Region<D>, axis: usize, count: usize) -> Vec<Region<D>> {
    let start = region.index();
    let size = region.size();
    let len = size[axis];
    let base = len / count;
    let extra = len % count;
    let mut parts = Vec::with_capacity(count);
    let mut cursor = start.0[axis];
    for i in 0..count {
        let step = base + usize::from(i < extra);
        let mut index: Index<D> = start;
        let mut part_size: Size<D> = size;
        index.0[axis] = cursor;
        part_size.0[axis] = step;
        parts.push(Region::new(index, part_size));
        cursor += step as i64;
    }
    parts
}
