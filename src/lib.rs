pub mod app;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod reflection;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use app::{AppContext, launch};
pub use config::Config;
pub use error::RagError;
pub use reflection::ReflectionController;
