pub mod core;
pub mod export;
pub mod pipeline;

pub use core::error::{BundleError, ConfigError};
pub use core::model::{Chart, Content, ExportFormat, JsonOptions, MimeBundle, Mode, RenderOptions, Spec};
pub use core::target::OutputTarget;
pub use pipeline::{resolve, save, SaveOptions, SaveReport};
