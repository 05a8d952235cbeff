pub mod configuration;
pub mod path;
pub mod target;
