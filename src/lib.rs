//! # volume-pipeline library
//!
//! This crate is a demand-driven processing core for N-dimensional images.
//! Images are dense buffers addressed by integer indices over half-open
//! regions; filters are connected into a pipeline and only the parts of
//! the pipeline that are out of date are executed, only over the region a
//! consumer asked for.
//!
//! An update runs in three passes over the stages upstream of the target:
//!  - Information: output geometry (largest possible region, spacing,
//!    origin, direction) flows downstream.
//!  - Requested region: each filter tells which input region it needs for
//!    the region it is asked to produce; requests are cropped to what the
//!    producer can deliver.
//!  - Data: a stage regenerates when it, or anything upstream, was modified
//!    after its last execution, or when its output does not cover the
//!    request. Generation is split into sub-regions run on a rayon pool.
//!
//! Besides the core the crate ships a handful of reference filters, a DICOM
//! series source and a slice exporter.
//!
//! # Examples
//!
//! ## Smoothing a DICOM series and exporting the center slice
//!
//! ```no_run
//! # use volume_pipeline::{
//! #     BoundaryCondition, DicomSeriesSource, MeanFilter, Orientation, Pipeline, PipelineConfig,
//! #     SortBy, slice,
//! # };
//! let mut pipeline = Pipeline::<f32, 3>::new(PipelineConfig::default())?;
//! let source = pipeline.add_stage("dicom", DicomSeriesSource::open("dicom", SortBy::InstanceNumber)?);
//! let mean = pipeline.add_stage(
//!     "mean",
//!     MeanFilter::new([1, 1, 1]).with_boundary(BoundaryCondition::ZeroFluxNeumann),
//! );
//! pipeline.connect(source, mean, 0)?;
//!
//! let volume = pipeline.update(mean)?;
//! let center = slice::center_slice(&volume, Orientation::Sagittal);
//! slice::extract_slice(&volume, center, Orientation::Sagittal)?.save("result.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Requesting part of an output
//!
//! ```
//! # use volume_pipeline::{Image, Index, MeanFilter, ImageSource, Pipeline, PipelineConfig, Region, Size};
//! let input = Image::<f64, 2>::from_fn(Region::from_size(Size([64, 64])), |i| i[0] as f64).unwrap();
//! let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
//! let source = pipeline.add_stage("source", ImageSource::new(input));
//! let mean = pipeline.add_stage("mean", MeanFilter::new([2, 2]));
//! pipeline.connect(source, mean, 0).unwrap();
//!
//! let tile = Region::new(Index([10, 10]), Size([8, 8]));
//! let output = pipeline.update_region(mean, tile).unwrap();
//! assert_eq!(*output.buffered_region(), tile);
//! assert_eq!(pipeline.requested_region(source).unwrap(), Some(tile.pad([2, 2])));
//! ```

pub mod addressing;
pub mod config;
pub mod dicom_source;
pub mod enums;
pub mod filters;
pub mod image;
pub mod iterator;
pub mod neighborhood;
pub mod pipeline;
pub mod region;
pub mod slice;
pub mod splitter;
pub mod threader;
pub mod time_stamp;

pub use crate::config::PipelineConfig;
pub use crate::dicom_source::{DicomSeriesSource, VolumeLoader, VolumeLoaderError};
pub use crate::enums::{AllocationPolicy, BoundaryCondition, Orientation, PipelineState, SortBy, Threading};
pub use crate::filters::{AddImageFilter, ImageSource, MeanFilter, RescaleIntensityFilter, ShiftScaleFilter};
pub use crate::image::{Image, ImageError, ImageInformation, ImageViewMut, Pixel};
pub use crate::pipeline::{ErrorKind, FilterError, GenerateContext, ImageFilter, OutputRef, Pipeline, PipelineError, StageId};
pub use crate::region::{Index, Offset, Region, Size};
