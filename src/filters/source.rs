use crate::image::{Image, ImageInformation, ImageViewMut, Pixel};
use crate::pipeline::{FilterError, GenerateContext, ImageFilter};
use crate::region::Region;

use std::sync::Arc;

/// Pipeline source serving an image already in memory.
///
/// The largest possible region is the held image's buffered region.
#[derive(Clone, Debug)]
pub struct ImageSource<T, const D: usize> {
    image: Arc<Image<T, D>>,
}

impl<T: Pixel, const D: usize> ImageSource<T, D> {
    pub fn new(image: Image<T, D>) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn from_shared(image: Arc<Image<T, D>>) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &Arc<Image<T, D>> {
        &self.image
    }

    /// Replaces the served image. Use through
    /// [`Pipeline::configure`](crate::pipeline::Pipeline::configure) so
    /// downstream stages see the change.
    pub fn set_image(&mut self, image: Image<T, D>) {
        self.image = Arc::new(image);
    }
}

impl<T: Pixel, const D: usize> ImageFilter<T, D> for ImageSource<T, D> {
    fn number_of_inputs(&self) -> usize {
        0
    }

    fn generate_output_information(
        &self,
        _inputs: &[ImageInformation<D>],
    ) -> Result<ImageInformation<D>, FilterError> {
        let mut information = *self.image.information();
        information.largest_possible_region = *self.image.buffered_region();
        Ok(information)
    }

    fn generate(
        &self,
        _ctx: &GenerateContext<'_, T, D>,
        region: &Region<D>,
        outputs: &mut [ImageViewMut<'_, T, D>],
    ) -> Result<(), FilterError> {
        for output in outputs {
            output.copy_region_from(&self.image, region)?;
        }
        Ok(())
    }
}
