use std::sync::{Arc, Mutex};

use volume_pipeline::threader::AbortHandle;
use volume_pipeline::{
    FilterError, GenerateContext, ImageFilter, ImageInformation, ImageViewMut, Pixel, Region, Threading,
};

/// Pointwise copy that records every partition it is asked to generate,
/// along with the buffered region its output view reports.
#[derive(Clone, Default)]
pub struct RecordingFilter<const D: usize> {
    pub regions: Arc<Mutex<Vec<Region<D>>>>,
    pub buffers: Arc<Mutex<Vec<Region<D>>>>,
    pub threading: Threading,
}

impl<const D: usize> RecordingFilter<D> {
    pub fn single_threaded() -> Self {
        Self {
            threading: Threading::SingleThreaded,
            ..Self::default()
        }
    }

    pub fn recorded(&self) -> Vec<Region<D>> {
        self.regions.lock().unwrap().clone()
    }

    pub fn recorded_buffers(&self) -> Vec<Region<D>> {
        self.buffers.lock().unwrap().clone()
    }
}

impl<T: Pixel, const D: usize> ImageFilter<T, D> for RecordingFilter<D> {
    fn threading(&self) -> Threading {
        self.threading
    }

    fn generate(
        &self,
        ctx: &GenerateContext<'_, T, D>,
        region: &Region<D>,
        outputs: &mut [ImageViewMut<'_, T, D>],
    ) -> Result<(), FilterError> {
        self.regions.lock().unwrap().push(*region);
        self.buffers.lock().unwrap().push(*outputs[0].buffered_region());
        outputs[0].copy_region_from(ctx.input(0)?, region)?;
        Ok(())
    }
}

/// Always fails while generating.
#[derive(Clone, Copy, Default)]
pub struct FailingFilter;

impl<T: Pixel, const D: usize> ImageFilter<T, D> for FailingFilter {
    fn generate(
        &self,
        _ctx: &GenerateContext<'_, T, D>,
        _region: &Region<D>,
        _outputs: &mut [ImageViewMut<'_, T, D>],
    ) -> Result<(), FilterError> {
        Err(FilterError::Failed("sensor saturated".into()))
    }
}

/// Requests an abort from inside its own generation when armed.
#[derive(Clone)]
pub struct AbortingFilter {
    pub handle: AbortHandle,
    pub armed: bool,
}

impl<T: Pixel, const D: usize> ImageFilter<T, D> for AbortingFilter {
    fn threading(&self) -> Threading {
        Threading::SingleThreaded
    }

    fn generate(
        &self,
        ctx: &GenerateContext<'_, T, D>,
        region: &Region<D>,
        outputs: &mut [ImageViewMut<'_, T, D>],
    ) -> Result<(), FilterError> {
        if self.armed {
            self.handle.abort();
        }
        ctx.check_abort()?;
        outputs[0].copy_region_from(ctx.input(0)?, region)?;
        Ok(())
    }
}

/// Source that declares `region` without ever producing data for it.
#[derive(Clone, Copy)]
pub struct DeclaredSource<const D: usize> {
    pub region: Region<D>,
}

impl<T: Pixel, const D: usize> ImageFilter<T, D> for DeclaredSource<D> {
    fn number_of_inputs(&self) -> usize {
        0
    }

    fn generate_output_information(
        &self,
        _inputs: &[ImageInformation<D>],
    ) -> Result<ImageInformation<D>, FilterError> {
        Ok(ImageInformation::new(self.region))
    }

    fn generate(
        &self,
        _ctx: &GenerateContext<'_, T, D>,
        _region: &Region<D>,
        _outputs: &mut [ImageViewMut<'_, T, D>],
    ) -> Result<(), FilterError> {
        Err(FilterError::Failed("no pixel data".into()))
    }
}

/// Two outputs: the input unchanged, and the input doubled.
#[derive(Clone, Copy, Default)]
pub struct CopyAndDoubleFilter;

impl<T: Pixel, const D: usize> ImageFilter<T, D> for CopyAndDoubleFilter {
    fn number_of_outputs(&self) -> usize {
        2
    }

    fn generate(
        &self,
        ctx: &GenerateContext<'_, T, D>,
        region: &Region<D>,
        outputs: &mut [ImageViewMut<'_, T, D>],
    ) -> Result<(), FilterError> {
        let input = ctx.input(0)?;
        outputs[0].copy_region_from(input, region)?;
        let mut doubled = outputs[1].region_iter_mut(region)?;
        for (_, value) in input.region_iter(region)? {
            doubled.set(T::from_f64(2.0 * value.to_f64()));
            doubled.advance();
        }
        Ok(())
    }
}
