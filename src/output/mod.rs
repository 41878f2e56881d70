pub mod export;

pub use export::{write_export, ExportError};
