//! Image references: which images a drink ends up with, and the files behind
//! the local ones.

pub mod resolver;
pub mod uploads;

pub use uploads::{IncomingImage, UploadRules, UploadStore};
