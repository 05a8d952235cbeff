pub mod demo;
pub mod scene;
pub mod sphere_world;
pub mod straight_line;
