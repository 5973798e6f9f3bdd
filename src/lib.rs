pub mod config;
pub mod geometry;
pub mod io;
pub mod pointing;
pub mod system;
pub mod tracking;
