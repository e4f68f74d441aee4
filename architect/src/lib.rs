pub(crate) mod artifact;
pub(crate) mod builder;
pub(crate) mod config;
pub(crate) mod context;
pub(crate) mod docker;
pub(crate) mod error;
pub(crate) mod image;
pub(crate) mod metadata;
pub(crate) mod process;
pub(crate) mod registry;
pub(crate) mod tagger;
pub(crate) mod temp_path;
pub(crate) mod version;

pub mod cli;

pub use error::{Error, Stage};

pub(crate) type Result<T, E = Box<dyn std::error::Error + Send + Sync + 'static>> =
    std::result::Result<T, E>;
