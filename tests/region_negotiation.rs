mod common;

use common::{noise_3d, pipeline, ramp_2d};
use volume_pipeline::{
    ErrorKind, ImageSource, Index, MeanFilter, PipelineError, Region, RescaleIntensityFilter, ShiftScaleFilter,
    Size,
};

#[test]
fn padding_filter_requests_padded_region() {
    let mut p = pipeline::<f64, 2>(2);
    let source = p.add_stage("source", ImageSource::new(ramp_2d(32, 32)));
    let mean = p.add_stage("mean", MeanFilter::new([2, 2]));
    p.connect(source, mean, 0).unwrap();

    let tile = Region::new(Index([10, 10]), Size([5, 5]));
    p.update_region(mean, tile).unwrap();

    assert_eq!(
        p.requested_region(source).unwrap(),
        Some(Region::new(Index([8, 8]), Size([9, 9])))
    );
    assert_eq!(p.requested_region(mean).unwrap(), Some(tile));
    assert!(!p.boundary_clipped(mean).unwrap());
}

#[test]
fn padded_request_is_cropped_at_the_image_edge() {
    let mut p = pipeline::<f64, 2>(2);
    let source = p.add_stage("source", ImageSource::new(ramp_2d(16, 16)));
    let mean = p.add_stage("mean", MeanFilter::new([2, 2]));
    p.connect(source, mean, 0).unwrap();

    let tile = Region::new(Index([10, 10]), Size([5, 5]));
    let part = p.update_region(mean, tile).unwrap();

    assert_eq!(
        p.requested_region(source).unwrap(),
        Some(Region::new(Index([8, 8]), Size([8, 8])))
    );
    assert!(p.boundary_clipped(mean).unwrap());

    // Same values as a full-image run.
    let mut reference = pipeline::<f64, 2>(1);
    let s = reference.add_stage("source", ImageSource::new(ramp_2d(16, 16)));
    let m = reference.add_stage("mean", MeanFilter::new([2, 2]));
    reference.connect(s, m, 0).unwrap();
    let full = reference.update(m).unwrap();
    for (index, value) in part.region_iter(&tile).unwrap() {
        assert_eq!(value, full.pixel(&index).unwrap(), "at {index:?}");
    }
}

#[test]
fn pointwise_chain_forwards_request_unchanged() {
    let mut p = pipeline::<f32, 3>(2);
    let source = p.add_stage("source", ImageSource::new(noise_3d([6, 6, 6])));
    let a = p.add_stage("a", ShiftScaleFilter::new(1.0, 1.0));
    let b = p.add_stage("b", ShiftScaleFilter::new(-1.0, 1.0));
    p.connect(source, a, 0).unwrap();
    p.connect(a, b, 0).unwrap();

    let tile = Region::new(Index([1, 2, 3]), Size([2, 2, 2]));
    let out = p.update_region(b, tile).unwrap();

    assert_eq!(p.requested_region(source).unwrap(), Some(tile));
    assert_eq!(p.requested_region(a).unwrap(), Some(tile));
    let input = p.output(source).unwrap().unwrap();
    assert_eq!(out.as_slice(), input.as_slice());
}

#[test]
fn global_filter_requests_whole_input() {
    let mut p = pipeline::<f64, 2>(2);
    let source = p.add_stage("source", ImageSource::new(ramp_2d(12, 9)));
    let rescale = p.add_stage("rescale", RescaleIntensityFilter::new(0.0, 1.0));
    p.connect(source, rescale, 0).unwrap();

    p.update_region(rescale, Region::new(Index([0, 0]), Size([2, 2])))
        .unwrap();

    let whole = Region::from_size(Size([12, 9]));
    assert_eq!(p.requested_region(source).unwrap(), Some(whole));
    assert_eq!(p.requested_region(rescale).unwrap(), Some(whole));
}

#[test]
fn request_outside_largest_region_is_rejected() {
    let mut p = pipeline::<f64, 2>(1);
    let source = p.add_stage("source", ImageSource::new(ramp_2d(8, 8)));

    let err = p
        .update_region(source, Region::new(Index([6, 6]), Size([4, 4])))
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidRequestedRegion { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(p.execution_count(source).unwrap(), 0);
}

#[test]
fn source_with_offset_region_keeps_its_indices() {
    let region = Region::new(Index([-4, 10]), Size([6, 3]));
    let image = volume_pipeline::Image::<i32, 2>::from_fn(region, |i| (i[0] * i[1]) as i32).unwrap();
    let mut p = pipeline::<i32, 2>(2);
    let source = p.add_stage("source", ImageSource::new(image));
    let shift = p.add_stage("shift", ShiftScaleFilter::new(0.0, 2.0));
    p.connect(source, shift, 0).unwrap();

    let out = p.update(shift).unwrap();
    assert_eq!(*out.largest_possible_region(), region);
    assert_eq!(out.pixel(&Index([-3, 11])).unwrap(), -66);
}
