//! mktheapidocs: markdown API documentation for Python packages.
//!
//! Python sources are read statically, numpydoc docstrings are split into
//! sections, and every module becomes one markdown page. The same pipeline
//! backs the `mktheapidocs` CLI and the `mktheapidocs-site` integration.

pub mod anchor;
pub mod config;
pub mod discover;
pub mod logging;
pub mod model;
pub mod parser;
pub mod plugin;
pub mod render;
pub mod types;
pub mod watch;
