//! A small file-backed wiki.
//!
//! Pages are plain text files named after their title. They are viewed,
//! edited and saved over HTTP, `[Title]` tokens become links to other pages,
//! and every view carries an index of all pages.

pub mod components;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod logger;
pub mod routes;
pub mod services;
pub mod types;
pub mod utils;

pub use components::{TemplateComponent, TemplateFunctions, WikiFunctions};
pub use config::Config;
pub use errors::WikiError;
pub use routes::{build_app, Action, PathRouter, Route};
pub use services::{FileStore, IndexBuilder, LinkRewriter, PageStore};
pub use types::{AppState, Markup, Page};

pub use utils::{escape_attr, escape_html, escape_html_bytes};
