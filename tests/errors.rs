mod common;

use common::filters::{AbortingFilter, DeclaredSource, FailingFilter};
use common::{pipeline, ramp_2d};
use volume_pipeline::config::PipelineConfig;
use volume_pipeline::{
    AddImageFilter, BoundaryCondition, ErrorKind, FilterError, ImageError, ImageSource, Index, MeanFilter, Pipeline,
    PipelineError, PipelineState, Region, ShiftScaleFilter, Size,
};

#[test]
fn connecting_back_upstream_is_a_cycle() {
    let mut p = pipeline::<f64, 2>(1);
    let a = p.add_stage("a", ShiftScaleFilter::default());
    let b = p.add_stage("b", ShiftScaleFilter::default());
    let c = p.add_stage("c", AddImageFilter);
    p.connect(a, b, 0).unwrap();
    p.connect(b, c, 0).unwrap();

    assert!(matches!(p.connect(c, a, 0), Err(PipelineError::Cycle { .. })));
    assert!(matches!(p.connect(c, c, 1), Err(PipelineError::Cycle { .. })));
    // Feeding a stage twice is not a cycle.
    p.connect(a, c, 1).unwrap();
}

#[test]
fn invalid_slot_and_output_are_rejected() {
    let mut p = pipeline::<f64, 2>(1);
    let source = p.add_stage("source", ImageSource::new(ramp_2d(4, 4)));
    let shift = p.add_stage("shift", ShiftScaleFilter::default());

    assert!(matches!(
        p.connect(source, shift, 1),
        Err(PipelineError::InvalidInputSlot { slot: 1, available: 1, .. })
    ));
    assert!(matches!(
        p.connect(source.output(1), shift, 0),
        Err(PipelineError::InvalidOutput { output: 1, .. })
    ));
}

#[test]
fn unconnected_input_is_a_configuration_error() {
    let mut p = pipeline::<f64, 2>(1);
    let source = p.add_stage("source", ImageSource::new(ramp_2d(4, 4)));
    let shift = p.add_stage("shift", ShiftScaleFilter::default());
    p.connect(source, shift, 0).unwrap();
    p.update(shift).unwrap();

    assert_eq!(p.disconnect(shift, 0).unwrap(), Some(source.output(0)));
    let err = p.update(shift).unwrap_err();

    assert!(matches!(err, PipelineError::MissingInput { slot: 0, .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.origin(), Some("shift"));
}

#[test]
fn failure_upstream_is_wrapped_with_its_origin() {
    let mut p = pipeline::<f64, 2>(2);
    let source = p.add_stage("source", ImageSource::new(ramp_2d(8, 8)));
    let failing = p.add_stage("failing", FailingFilter);
    let shift = p.add_stage("shift", ShiftScaleFilter::default());
    p.connect(source, failing, 0).unwrap();
    p.connect(failing, shift, 0).unwrap();

    let err = p.update(shift).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.origin(), Some("failing"));
    let PipelineError::Upstream { stage, source, .. } = &err else {
        panic!("expected upstream error, got {err:?}");
    };
    assert_eq!(stage, "shift");
    assert!(matches!(
        source.as_ref(),
        PipelineError::Execution {
            source: FilterError::Failed(_),
            ..
        }
    ));
    assert!(err.to_string().contains("failing"));
    assert_eq!(p.state(failing).unwrap(), PipelineState::Unknown);
    assert_eq!(p.execution_count(shift).unwrap(), 0);
    assert!(p.output(shift).unwrap().is_none());
}

#[test]
fn abort_stops_the_update_and_clears_on_the_next() {
    let mut p = pipeline::<f64, 2>(2);
    let handle = p.abort_handle();
    let source = p.add_stage("source", ImageSource::new(ramp_2d(8, 8)));
    let aborting = p.add_stage("aborting", AbortingFilter { handle, armed: true });
    p.connect(source, aborting, 0).unwrap();

    let err = p.update(aborting).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Aborted);
    assert!(matches!(err, PipelineError::Aborted { .. }));
    assert_eq!(p.execution_count(aborting).unwrap(), 0);

    p.configure(aborting, |f: &mut AbortingFilter| f.armed = false).unwrap();
    p.update(aborting).unwrap();
    assert_eq!(p.execution_count(aborting).unwrap(), 1);
}

#[test]
fn abort_requested_between_updates_cancels_the_next_one() {
    let mut p = pipeline::<f64, 2>(2);
    let source = p.add_stage("source", ImageSource::new(ramp_2d(8, 8)));
    let shift = p.add_stage("shift", ShiftScaleFilter::new(1.0, 2.0));
    p.connect(source, shift, 0).unwrap();

    p.abort_handle().abort();
    let err = p.update(shift).unwrap_err();
    assert!(matches!(err, PipelineError::Aborted { .. }));
    assert_eq!(err.kind(), ErrorKind::Aborted);
    assert_eq!(err.origin(), Some("shift"));
    assert_eq!(p.execution_count(source).unwrap(), 0);
    assert_eq!(p.execution_count(shift).unwrap(), 0);
    assert!(!p.abort_handle().is_aborted());

    p.update(shift).unwrap();
    assert_eq!(p.execution_count(shift).unwrap(), 1);
}

#[test]
fn output_too_large_to_allocate_is_an_allocation_error() {
    let mut p = pipeline::<u64, 2>(1);
    let huge = p.add_stage("huge", DeclaredSource { region: Region::from_size(Size([1 << 40, 1 << 20])) });

    let err = p.update(huge).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Allocation);
    assert_eq!(err.origin(), Some("huge"));
    assert!(matches!(
        &err,
        PipelineError::Allocation { source: ImageError::Allocation { pixels, .. }, .. } if *pixels == 1 << 60
    ));
    assert!(err.to_string().contains("could not allocate"));
    assert_eq!(p.state(huge).unwrap(), PipelineState::Unknown);
    assert!(p.output(huge).unwrap().is_none());
}

#[test]
fn pixel_count_overflow_is_an_allocation_error() {
    let mut p = pipeline::<u8, 2>(1);
    let region = Region::from_size(Size([1 << 40, 1 << 40]));
    let source = p.add_stage("overflowing", DeclaredSource { region });
    let shift = p.add_stage("shift", ShiftScaleFilter::default());
    p.connect(source, shift, 0).unwrap();

    let err = p.update(shift).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Allocation);
    assert_eq!(err.origin(), Some("overflowing"));
    let PipelineError::Upstream { source, .. } = &err else {
        panic!("expected upstream error, got {err:?}");
    };
    assert!(matches!(
        source.as_ref(),
        PipelineError::Allocation {
            source: ImageError::TooLarge { .. },
            ..
        }
    ));
    assert_eq!(p.execution_count(shift).unwrap(), 0);
}

#[test]
fn mismatched_inputs_fail_the_information_pass() {
    let mut p = pipeline::<f64, 2>(1);
    let a = p.add_stage("a", ImageSource::new(ramp_2d(4, 4)));
    let b = p.add_stage("b", ImageSource::new(ramp_2d(5, 4)));
    let add = p.add_stage("add", AddImageFilter);
    p.connect(a, add, 0).unwrap();
    p.connect(b, add, 1).unwrap();

    let err = p.update(add).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Configuration {
            source: FilterError::IncompatibleInputs(_),
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(p.execution_count(a).unwrap(), 0);
}

#[test]
fn neighborhood_without_boundary_condition_fails_at_the_edge() {
    let mut p = pipeline::<f64, 2>(2);
    let source = p.add_stage("source", ImageSource::new(ramp_2d(8, 8)));
    let mean = p.add_stage(
        "mean",
        MeanFilter::new([1, 1]).with_boundary(BoundaryCondition::None),
    );
    p.connect(source, mean, 0).unwrap();

    let err = p.update(mean).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);

    // Interior requests have their whole window available.
    let inner = Region::new(Index([2, 2]), Size([3, 3]));
    p.update_region(mean, inner).unwrap();
}

#[test]
fn configuring_with_the_wrong_type_is_rejected() {
    let mut p = pipeline::<f64, 2>(1);
    let shift = p.add_stage("shift", ShiftScaleFilter::default());

    let err = p
        .configure(shift, |f: &mut MeanFilter<2>| f.set_radius([3, 3]))
        .unwrap_err();
    assert!(matches!(err, PipelineError::StageTypeMismatch { .. }));
    assert!(p.filter::<ShiftScaleFilter>(shift).is_ok());
}

#[test]
fn invalid_configuration_is_rejected() {
    let config = PipelineConfig {
        workers: Some(0),
        ..PipelineConfig::default()
    };
    assert!(matches!(
        Pipeline::<u8, 2>::new(config),
        Err(PipelineError::Config(_))
    ));
}
