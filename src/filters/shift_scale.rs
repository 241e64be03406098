use crate::image::{ImageViewMut, Pixel};
use crate::pipeline::{FilterError, GenerateContext, ImageFilter};
use crate::region::Region;

/// `(value + shift) * scale`, pixel by pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShiftScaleFilter {
    pub shift: f64,
    pub scale: f64,
}

impl Default for ShiftScaleFilter {
    fn default() -> Self {
        Self {
            shift: 0.0,
            scale: 1.0,
        }
    }
}

impl ShiftScaleFilter {
    pub fn new(shift: f64, scale: f64) -> Self {
        Self { shift, scale }
    }
}

impl<T: Pixel, const D: usize> ImageFilter<T, D> for ShiftScaleFilter {
    fn generate(
        &self,
        ctx: &GenerateContext<'_, T, D>,
        region: &Region<D>,
        outputs: &mut [ImageViewMut<'_, T, D>],
    ) -> Result<(), FilterError> {
        let input = ctx.input(0)?;
        let mut out = outputs[0].region_iter_mut(region)?;
        for (_, value) in input.region_iter(region)? {
            out.set(T::from_f64((value.to_f64() + self.shift) * self.scale));
            out.advance();
        }
        Ok(())
    }
}
