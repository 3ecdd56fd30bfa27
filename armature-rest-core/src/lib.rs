// Route compilation and argument binding for Armature REST resources
// Handler types describe their endpoints once; this crate compiles those
// descriptions into route definitions and binds request data to arguments.

pub mod binder;
pub mod collector;
pub mod compiler;
pub mod config;
pub mod container;
pub mod context;
pub mod definition;
pub mod error;
pub mod handler;
pub mod http;
pub mod logging;
pub mod metadata;
pub mod parameter;
pub mod path;
pub mod reader;
pub mod request;
pub mod types;

// Re-export commonly used types
pub use binder::*;
pub use collector::{CollectedMethod, collect};
pub use compiler::*;
pub use config::*;
pub use container::*;
pub use context::*;
pub use definition::*;
pub use error::*;
pub use handler::*;
pub use http::*;
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use metadata::*;
pub use parameter::*;
pub use path::{PathSegment, PathTemplate};
pub use reader::*;
pub use request::*;
pub use types::*;
