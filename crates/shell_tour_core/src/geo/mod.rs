pub mod geometry;
pub mod great_circle;
