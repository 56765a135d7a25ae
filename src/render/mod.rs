//! Renderer module: entity fragments assembled into one markdown page per module.

pub mod entity;
pub mod module;
pub mod sections;
pub mod signature;

use sections::MalformedReference;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{entity}: {source}")]
    Reference {
        entity: String,
        #[source]
        source: MalformedReference,
    },
    #[error("cannot create directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// ATX heading at `depth`.
pub(crate) fn heading(depth: usize, title: &str) -> String {
    format!("{} {}", "#".repeat(depth), title)
}
