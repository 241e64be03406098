//! Reference filters built on the pipeline contracts.
//!
//! They cover the three input-region policies a filter can have:
//! pointwise ([`ShiftScaleFilter`], [`AddImageFilter`]), neighborhood
//! ([`MeanFilter`]) and global ([`RescaleIntensityFilter`]).

mod add;
mod mean;
mod rescale;
mod shift_scale;
mod source;

pub use add::AddImageFilter;
pub use mean::MeanFilter;
pub use rescale::RescaleIntensityFilter;
pub use shift_scale::ShiftScaleFilter;
pub use source::ImageSource;
