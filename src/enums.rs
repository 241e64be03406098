use serde::{Deserialize, Serialize};

/// Slicing axis of a 3-D volume whose index is `[x, y, z]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

/// How a neighborhood iterator reads positions outside the buffered region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCondition {
    /// No extension. The iterated region padded by the radius must lie
    /// inside the buffered region.
    None,
    /// Out-of-bounds neighbors read the nearest in-bounds pixel.
    #[default]
    ZeroFluxNeumann,
    /// Out-of-bounds neighbors wrap around the buffered extent.
    Periodic,
}

/// How much memory a stage allocates for its output when it regenerates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    /// Allocate exactly the requested region.
    #[default]
    RequestedRegion,
    /// Allocate the largest possible region. Uses more memory but the
    /// allocation covers any later request.
    LargestPossibleRegion,
}

/// Per-output lifecycle of a pipeline stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipelineState {
    #[default]
    Unknown,
    InformationValid,
    RegionsNegotiated,
    DataValid,
}

/// Whether a filter's generation procedure may run on several workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Threading {
    #[default]
    Parallel,
    SingleThreaded,
}

/// Key used to order the slices of a DICOM series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}
