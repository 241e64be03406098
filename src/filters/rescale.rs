use crate::image::{ImageInformation, ImageViewMut, Pixel};
use crate::pipeline::{FilterError, GenerateContext, ImageFilter};
use crate::region::Region;

/// Linearly maps the input's full intensity range onto
/// `[output_minimum, output_maximum]`.
///
/// The range is a whole-image statistic, so the filter always requests
/// and produces the largest possible region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RescaleIntensityFilter {
    output_minimum: f64,
    output_maximum: f64,
    input_range: Option<(f64, f64)>,
}

impl Default for RescaleIntensityFilter {
    fn default() -> Self {
        Self::new(0.0, 255.0)
    }
}

impl RescaleIntensityFilter {
    pub fn new(output_minimum: f64, output_maximum: f64) -> Self {
        Self {
            output_minimum,
            output_maximum,
            input_range: None,
        }
    }

    pub fn output_range(&self) -> (f64, f64) {
        (self.output_minimum, self.output_maximum)
    }

    pub fn set_output_range(&mut self, minimum: f64, maximum: f64) {
        self.output_minimum = minimum;
        self.output_maximum = maximum;
    }

    /// Input `(min, max)` measured by the last execution.
    pub fn input_range(&self) -> Option<(f64, f64)> {
        self.input_range
    }

    fn map(&self, value: f64, (min, max): (f64, f64)) -> f64 {
        if max > min {
            (value - min) * (self.output_maximum - self.output_minimum) / (max - min) + self.output_minimum
        } else {
            self.output_minimum
        }
    }
}

impl<T: Pixel, const D: usize> ImageFilter<T, D> for RescaleIntensityFilter {
    fn enlarge_output_requested_region(
        &self,
        _requested: &Region<D>,
        output: &ImageInformation<D>,
    ) -> Region<D> {
        output.largest_possible_region
    }

    fn required_input_region(
        &self,
        _input: usize,
        _output_region: &Region<D>,
        input_information: &ImageInformation<D>,
    ) -> Region<D> {
        input_information.largest_possible_region
    }

    fn before_generate(&mut self, ctx: &GenerateContext<'_, T, D>) -> Result<(), FilterError> {
        if self.output_minimum > self.output_maximum {
            return Err(FilterError::InvalidParameter(format!(
                "output minimum {} exceeds maximum {}",
                self.output_minimum, self.output_maximum
            )));
        }
        let input = ctx.input(0)?;
        let range = input
            .region_iter(input.largest_possible_region())?
            .map(|(_, v)| v.to_f64())
            .fold(None, |range: Option<(f64, f64)>, v| match range {
                Some((min, max)) => Some((min.min(v), max.max(v))),
                None => Some((v, v)),
            });
        self.input_range = range;
        Ok(())
    }

    fn generate(
        &self,
        ctx: &GenerateContext<'_, T, D>,
        region: &Region<D>,
        outputs: &mut [ImageViewMut<'_, T, D>],
    ) -> Result<(), FilterError> {
        let input = ctx.input(0)?;
        let range = self.input_range.unwrap_or((0.0, 0.0));
        let mut out = outputs[0].region_iter_mut(region)?;
        for (_, value) in input.region_iter(region)? {
            out.set(T::from_f64(self.map(value.to_f64(), range)));
            out.advance();
        }
        Ok(())
    }
}
