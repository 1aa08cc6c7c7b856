//! Edit parameters and 3D LUT handling.

pub mod lut;
pub mod params;
