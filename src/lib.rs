//! nanotools: a small action-based web framework
//!
//! - [`loader`]: identifier-to-file loaders and the loader chain
//! - [`container`]: named components with singleton/prototype lifecycles
//! - [`routing`]: action dispatch, argument binding, forward and redirect
//! - [`template`]: view scripts rendered inside a layout
//! - [`hash`]: hex digests and HMACs
//! - [`app`] and [`server`]: the HTTP/1.1 front end feeding the router

pub mod app;
pub mod config;
pub mod container;
pub mod error;
pub mod hash;
pub mod http;
pub mod loader;
pub mod logger;
pub mod routing;
pub mod server;
pub mod session;
pub mod template;

pub use error::{Error, Result};
