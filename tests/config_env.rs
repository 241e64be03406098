use volume_pipeline::Pipeline;
use volume_pipeline::config::{PipelineConfig, WORKERS_ENV};

// Only test in this binary, so the variable does not leak into others.
#[test]
fn environment_overrides_worker_count() {
    unsafe { std::env::set_var(WORKERS_ENV, "3") };
    let config = PipelineConfig::from_toml_str("workers = 7")
        .unwrap()
        .with_env_overrides()
        .unwrap();
    assert_eq!(config.resolved_workers(), 3);

    let pipeline = Pipeline::<u8, 2>::new(config).unwrap();
    assert_eq!(pipeline.config().workers, Some(3));

    unsafe { std::env::set_var(WORKERS_ENV, "0") };
    assert!(PipelineConfig::default().with_env_overrides().is_err());
    unsafe { std::env::remove_var(WORKERS_ENV) };
}
