//! Conf module — decoder driver configuration model and loading.

pub mod model;
pub mod load;

pub use model::{DecoderConfig, MalformedPolicy, OutputFormat};
pub use load::ConfigError;
