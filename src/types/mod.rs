use std::sync::Arc;

use crate::components::{TemplateComponent, WikiFunctions};
use crate::config::Config;
use crate::errors::WikiError;
use crate::routes::PathRouter;
use crate::services::{FileStore, IndexBuilder, LinkRewriter, PageStore};

/// Templates the handlers render
const REQUIRED_TEMPLATES: [&str; 2] = ["view", "edit"];

/// Application state shared across all handlers.
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn PageStore>,
    pub templates: Arc<TemplateComponent>,
    pub router: Arc<PathRouter>,
}

impl AppState {
    /// Wire file storage, templates and the router together from `config`
    pub fn from_config(config: Config) -> Result<Self, WikiError> {
        let store: Arc<dyn PageStore> = Arc::new(FileStore::new(config.data_dir.as_ref().clone()));
        let functions = WikiFunctions::new(
            LinkRewriter::new()?,
            IndexBuilder::new(store.clone(), &config.front_page),
        );
        let templates = TemplateComponent::load(&config.templates_dir, Arc::new(functions))?;
        for name in REQUIRED_TEMPLATES {
            if !templates.contains(name) {
                return Err(WikiError::TemplateError(format!(
                    "no {}.tpl template in {:?}",
                    name, config.templates_dir
                )));
            }
        }
        Ok(Self {
            config: Arc::new(config),
            store,
            templates: Arc::new(templates),
            router: Arc::new(PathRouter::new()?),
        })
    }
}

/// A titled unit of stored text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub body: Vec<u8>,
}

impl Page {
    pub fn new(title: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self { title: title.into(), body: body.into() }
    }

    /// An unsaved page with no content
    pub fn empty(title: impl Into<String>) -> Self {
        Self { title: title.into(), body: Vec::new() }
    }
}

/// HTML that has already been escaped (or is trusted) and must be emitted verbatim.
///
/// Held as bytes: page bodies are not required to be UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup(Vec<u8>);

impl Markup {
    pub fn new(html: impl Into<Vec<u8>>) -> Self {
        Self(html.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}
