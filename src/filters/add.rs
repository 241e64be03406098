use crate::image::{ImageInformation, ImageViewMut, Pixel};
use crate::pipeline::{FilterError, GenerateContext, ImageFilter};
use crate::region::Region;

/// Pixel-wise sum of two images with the same largest possible region.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddImageFilter;

impl<T: Pixel, const D: usize> ImageFilter<T, D> for AddImageFilter {
    fn number_of_inputs(&self) -> usize {
        2
    }

    fn generate_output_information(
        &self,
        inputs: &[ImageInformation<D>],
    ) -> Result<ImageInformation<D>, FilterError> {
        let [first, second] = inputs else {
            return Err(FilterError::MissingInput(inputs.len()));
        };
        if first.largest_possible_region != second.largest_possible_region {
            return Err(FilterError::IncompatibleInputs(format!(
                "largest possible regions differ: {} vs {}",
                first.largest_possible_region, second.largest_possible_region
            )));
        }
        Ok(*first)
    }

    fn generate(
        &self,
        ctx: &GenerateContext<'_, T, D>,
        region: &Region<D>,
        outputs: &mut [ImageViewMut<'_, T, D>],
    ) -> Result<(), FilterError> {
        let a = ctx.input(0)?.region_iter(region)?;
        let b = ctx.input(1)?.region_iter(region)?;
        let mut out = outputs[0].region_iter_mut(region)?;
        for ((_, x), (_, y)) in a.zip(b) {
            out.set(T::from_f64(x.to_f64() + y.to_f64()));
            out.advance();
        }
        Ok(())
    }
}
