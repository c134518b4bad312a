pub mod client;
pub mod config;
mod stream;
pub mod upload;

pub use client::Backend;
pub use config::BackendConfig;
pub use upload::{PdfFile, PDF_MEDIA_TYPE};
