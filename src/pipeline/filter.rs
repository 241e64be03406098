use crate::enums::Threading;
use crate::image::{Image, ImageInformation, ImageViewMut, Pixel};
use crate::pipeline::error::FilterError;
use crate::region::Region;
use crate::threader::AbortHandle;

use std::any::Any;
use std::sync::Arc;

/// What a stage hands to its filter while generating data.
///
/// Inputs are finished, read-only snapshots of the upstream outputs.
pub struct GenerateContext<'a, T, const D: usize> {
    stage: &'a str,
    inputs: &'a [Arc<Image<T, D>>],
    requested_region: Region<D>,
    information: &'a ImageInformation<D>,
    abort: &'a AbortHandle,
}

impl<'a, T: Pixel, const D: usize> GenerateContext<'a, T, D> {
    pub(crate) fn new(
        stage: &'a str,
        inputs: &'a [Arc<Image<T, D>>],
        requested_region: Region<D>,
        information: &'a ImageInformation<D>,
        abort: &'a AbortHandle,
    ) -> Self {
        Self {
            stage,
            inputs,
            requested_region,
            information,
            abort,
        }
    }

    pub fn stage(&self) -> &str {
        self.stage
    }

    pub fn input(&self, slot: usize) -> Result<&'a Image<T, D>, FilterError> {
        self.inputs
            .get(slot)
            .map(|image| image.as_ref())
            .ok_or(FilterError::MissingInput(slot))
    }

    pub fn number_of_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// The whole region being generated in this update; partitions are
    /// sub-regions of it.
    pub fn requested_region(&self) -> &Region<D> {
        &self.requested_region
    }

    /// Output information computed in the information pass.
    pub fn output_information(&self) -> &ImageInformation<D> {
        self.information
    }

    /// Fails with [`FilterError::Aborted`] once an abort was requested.
    /// Long generation loops poll this between rows or windows.
    pub fn check_abort(&self) -> Result<(), FilterError> {
        if self.abort.is_aborted() {
            Err(FilterError::Aborted)
        } else {
            Ok(())
        }
    }
}

/// Capability set of a pipeline stage.
///
/// The pipeline only talks to filters through this trait. Every method
/// except [`ImageFilter::generate`] has a default matching a pointwise,
/// single-input, single-output filter.
pub trait ImageFilter<T: Pixel, const D: usize>: Any + Send + Sync {
    fn number_of_inputs(&self) -> usize {
        1
    }

    fn number_of_outputs(&self) -> usize {
        1
    }

    /// Output geometry from the inputs' geometry. Sources override this.
    fn generate_output_information(
        &self,
        inputs: &[ImageInformation<D>],
    ) -> Result<ImageInformation<D>, FilterError> {
        inputs.first().copied().ok_or(FilterError::MissingInput(0))
    }

    /// Lets a filter grow the region it is asked to produce, e.g. to the
    /// whole largest possible region.
    fn enlarge_output_requested_region(
        &self,
        requested: &Region<D>,
        _output: &ImageInformation<D>,
    ) -> Region<D> {
        *requested
    }

    /// Region of input `input` needed to produce `output_region`. The
    /// pipeline crops the answer to the input's largest possible region.
    fn required_input_region(
        &self,
        _input: usize,
        output_region: &Region<D>,
        _input_information: &ImageInformation<D>,
    ) -> Region<D> {
        *output_region
    }

    fn threading(&self) -> Threading {
        Threading::Parallel
    }

    /// Runs once per execution before any partition.
    fn before_generate(&mut self, _ctx: &GenerateContext<'_, T, D>) -> Result<(), FilterError> {
        Ok(())
    }

    /// Fills `region` of every output through `outputs`, one view per
    /// output that can write only inside `region`. Called once per
    /// partition, possibly concurrently.
    fn generate(
        &self,
        ctx: &GenerateContext<'_, T, D>,
        region: &Region<D>,
        outputs: &mut [ImageViewMut<'_, T, D>],
    ) -> Result<(), FilterError>;

    /// Runs once per execution after every partition finished.
    fn after_generate(&mut self, _ctx: &GenerateContext<'_, T, D>) -> Result<(), FilterError> {
        Ok(())
    }
}
