use crate::enums::BoundaryCondition;
use crate::image::{ImageInformation, ImageViewMut, Pixel};
use crate::pipeline::{FilterError, GenerateContext, ImageFilter};
use crate::region::Region;

/// Box mean over a `(2r+1)` window per axis.
///
/// Asks its input for the output region padded by the radius. Pixels whose
/// window leaves the input's largest possible region are handled by the
/// boundary condition. Periodic wrapping needs the opposite edge, so with
/// [`BoundaryCondition::Periodic`] the whole input is requested.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeanFilter<const D: usize> {
    radius: [usize; D],
    boundary: BoundaryCondition,
}

impl<const D: usize> MeanFilter<D> {
    pub fn new(radius: [usize; D]) -> Self {
        Self {
            radius,
            boundary: BoundaryCondition::default(),
        }
    }

    pub fn with_boundary(mut self, boundary: BoundaryCondition) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn radius(&self) -> &[usize; D] {
        &self.radius
    }

    pub fn set_radius(&mut self, radius: [usize; D]) {
        self.radius = radius;
    }

    pub fn boundary(&self) -> BoundaryCondition {
        self.boundary
    }

    pub fn set_boundary(&mut self, boundary: BoundaryCondition) {
        self.boundary = boundary;
    }
}

impl<T: Pixel, const D: usize> ImageFilter<T, D> for MeanFilter<D> {
    fn required_input_region(
        &self,
        _input: usize,
        output_region: &Region<D>,
        input_information: &ImageInformation<D>,
    ) -> Region<D> {
        match self.boundary {
            BoundaryCondition::Periodic => input_information.largest_possible_region,
            _ => output_region.pad(self.radius),
        }
    }

    fn generate(
        &self,
        ctx: &GenerateContext<'_, T, D>,
        region: &Region<D>,
        outputs: &mut [ImageViewMut<'_, T, D>],
    ) -> Result<(), FilterError> {
        let input = ctx.input(0)?;
        let mut window = input.neighborhood_iter(self.radius, region, self.boundary)?;
        let mut out = outputs[0].region_iter_mut(region)?;
        let count = window.len() as f64;
        let row_start = region.index()[0];

        while !window.is_at_end() {
            if D > 0 && window.index()[0] == row_start {
                ctx.check_abort()?;
            }
            let sum: f64 = (0..window.len()).map(|p| window.get(p).to_f64()).sum();
            out.set(T::from_f64(sum / count));
            out.advance();
            window.advance();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::filters::ImageSource;
    use crate::image::Image;
    use crate::pipeline::Pipeline;
    use crate::region::{Index, Size};

    fn line(values: &[f64]) -> Image<f64, 1> {
        let region = Region::from_size(Size([values.len()]));
        Image::from_vec(ImageInformation::new(region), region, values.to_vec()).unwrap()
    }

    fn run(values: &[f64], filter: MeanFilter<1>) -> Vec<f64> {
        let mut pipeline = Pipeline::<f64, 1>::new(PipelineConfig {
            workers: Some(2),
            ..PipelineConfig::default()
        })
        .unwrap();
        let source = pipeline.add_stage("source", ImageSource::new(line(values)));
        let mean = pipeline.add_stage("mean", filter);
        pipeline.connect(source, mean, 0).unwrap();
        pipeline.update(mean).unwrap().as_slice().to_vec()
    }

    #[test]
    fn zero_flux_edges_repeat_the_border() {
        let out = run(&[3.0, 6.0, 9.0], MeanFilter::new([1]));
        assert_eq!(out, vec![4.0, 6.0, 8.0]);
    }

    #[test]
    fn periodic_edges_wrap() {
        let out = run(
            &[3.0, 6.0, 9.0],
            MeanFilter::new([1]).with_boundary(BoundaryCondition::Periodic),
        );
        assert_eq!(out, vec![6.0, 6.0, 6.0]);
    }

    #[test]
    fn constant_image_is_unchanged() {
        let out = run(&[2.0; 9], MeanFilter::new([2]));
        assert!(out.iter().all(|&v| v == 2.0));
    }

    #[test]
    fn requests_padded_input() {
        let filter = MeanFilter::new([2, 1]);
        let info = ImageInformation::new(Region::from_size(Size([10, 10])));
        let region = Region::new(Index([4, 4]), Size([2, 2]));
        let required = ImageFilter::<u8, 2>::required_input_region(&filter, 0, &region, &info);
        assert_eq!(required, Region::new(Index([2, 3]), Size([6, 4])));

        let periodic = filter.with_boundary(BoundaryCondition::Periodic);
        let required = ImageFilter::<u8, 2>::required_input_region(&periodic, 0, &region, &info);
        assert_eq!(required, info.largest_possible_region);
    }
}
