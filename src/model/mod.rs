pub mod config;
pub mod env_file;
pub mod step;
pub mod variant;
pub mod wrapper;
