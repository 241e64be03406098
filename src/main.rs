use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{LevelFilter, info};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use volume_pipeline::{
    BoundaryCondition, DicomSeriesSource, MeanFilter, Orientation, Pipeline, PipelineConfig, SortBy, slice,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OrientationArg {
    Axial,
    Coronal,
    Sagittal,
}

impl From<OrientationArg> for Orientation {
    fn from(value: OrientationArg) -> Self {
        match value {
            OrientationArg::Axial => Orientation::Axial,
            OrientationArg::Coronal => Orientation::Coronal,
            OrientationArg::Sagittal => Orientation::Sagittal,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

impl From<SortArg> for SortBy {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::ImagePositionPatient => SortBy::ImagePositionPatient,
            SortArg::TablePosition => SortBy::TablePosition,
            SortArg::InstanceNumber => SortBy::InstanceNumber,
            SortArg::None => SortBy::None,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BoundaryArg {
    None,
    ZeroFlux,
    Periodic,
}

impl From<BoundaryArg> for BoundaryCondition {
    fn from(value: BoundaryArg) -> Self {
        match value {
            BoundaryArg::None => BoundaryCondition::None,
            BoundaryArg::ZeroFlux => BoundaryCondition::ZeroFluxNeumann,
            BoundaryArg::Periodic => BoundaryCondition::Periodic,
        }
    }
}

/// Loads a DICOM series, optionally smooths it and writes one slice as PNG.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Directory containing the .dcm files of one series
    #[arg(default_value = "dicom")]
    input: PathBuf,

    #[arg(short, long, default_value = "result.png")]
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = OrientationArg::Coronal)]
    orientation: OrientationArg,

    /// Slice index; the center slice when omitted
    #[arg(long)]
    slice: Option<usize>,

    #[arg(long, value_enum, default_value_t = SortArg::InstanceNumber)]
    sort_by: SortArg,

    /// Radius of the mean filter; 0 disables smoothing
    #[arg(short, long, default_value_t = 0)]
    radius: usize,

    #[arg(long, value_enum, default_value_t = BoundaryArg::ZeroFlux)]
    boundary: BoundaryArg,

    /// Pipeline configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads, overrides the configuration and the environment
    #[arg(short, long)]
    workers: Option<usize>,

    /// Repeat for more output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let config = ConfigBuilder::new().set_target_level(LevelFilter::Off).build();
    TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path).with_context(|| format!("reading {}", path.display()))?,
        None => PipelineConfig::default(),
    }
    .with_env_overrides()?;
    if let Some(workers) = args.workers {
        config.workers = Some(workers);
    }

    let source = DicomSeriesSource::open(&args.input, args.sort_by.into())
        .with_context(|| format!("loading DICOM series from {}", args.input.display()))?;

    let mut pipeline = Pipeline::<f32, 3>::new(config)?;
    pipeline.set_progress_observer(|event| {
        log::debug!("{}: {:.0}%", event.stage, event.fraction() * 100.0);
    });
    let source = pipeline.add_stage("dicom", source);
    let target = if args.radius > 0 {
        let mean = pipeline.add_stage(
            "mean",
            MeanFilter::new([args.radius; 3]).with_boundary(args.boundary.into()),
        );
        pipeline.connect(source, mean, 0)?;
        mean
    } else {
        source
    };

    let volume = pipeline.update(target)?;
    let orientation = args.orientation.into();
    let index = args
        .slice
        .unwrap_or_else(|| slice::center_slice(&volume, orientation));
    info!(
        "volume {}, exporting {orientation:?} slice {index} of {}",
        volume.buffered_region(),
        slice::slice_count(&volume, orientation)
    );

    slice::extract_slice(&volume, index, orientation)?
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!("wrote {}", args.output.display());
    Ok(())
}
