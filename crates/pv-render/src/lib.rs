pub mod hit;
pub mod paint;
pub mod palette;

pub use hit::{hit_test, hit_test_screen};
pub use paint::{paint_pipeline, view_affine};
pub use palette::{Palette, Rgba};
