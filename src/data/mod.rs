//! Data module: typed fields, their decoder and the global assembly buffer.

pub mod decode;
pub mod field;
pub mod global_field;
