/// Data model shared by collectors and the histogram builder.
pub mod sample;
pub mod size;

pub use sample::SizeSample;
pub use size::{format_count, format_size};
