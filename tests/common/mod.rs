#![allow(dead_code)]

pub mod filters;

use volume_pipeline::config::PipelineConfig;
use volume_pipeline::splitter::{PartitionPolicy, SplitStrategy};
use volume_pipeline::{Image, Pipeline, Pixel, Region, Size};

/// Image over `[0, size)` whose pixels encode their index.
pub fn ramp_2d(width: usize, height: usize) -> Image<f64, 2> {
    let region = Region::from_size(Size([width, height]));
    Image::from_fn(region, |i| (i[0] + 1000 * i[1]) as f64).unwrap()
}

pub fn noise_3d(size: [usize; 3]) -> Image<f32, 3> {
    let region = Region::from_size(Size(size));
    Image::from_fn(region, |i| {
        let h = (i[0] * 73_856_093) ^ (i[1] * 19_349_663) ^ (i[2] * 83_492_791);
        h.rem_euclid(1024) as f32
    })
    .unwrap()
}

pub fn config(workers: usize, partitions: PartitionPolicy, split_strategy: SplitStrategy) -> PipelineConfig {
    PipelineConfig {
        workers: Some(workers),
        partitions,
        split_strategy,
        ..PipelineConfig::default()
    }
}

pub fn pipeline<T: Pixel, const D: usize>(workers: usize) -> Pipeline<T, D> {
    Pipeline::new(config(workers, PartitionPolicy::PerWorker(2), SplitStrategy::Multidimensional)).unwrap()
}
