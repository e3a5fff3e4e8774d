use std::collections::BTreeSet;
use std::sync::Arc;

use log::debug;

use crate::services::PageStore;
use crate::types::Markup;
use crate::utils::{escape_attr, escape_html};

const NO_PAGES: &str = "No pages";

/// Renders the list of known pages
pub struct IndexBuilder {
    store: Arc<dyn PageStore>,
    excluded: BTreeSet<String>,
}

impl IndexBuilder {
    /// The empty title and `front_page` are always excluded
    pub fn new(store: Arc<dyn PageStore>, front_page: &str) -> Self {
        let excluded = [String::new(), front_page.to_string()].into_iter().collect();
        Self { store, excluded }
    }

    /// Sorted titles minus exclusions. An unreadable store lists nothing.
    pub fn titles(&self) -> Vec<String> {
        let mut titles = match self.store.list_titles() {
            Ok(titles) => titles,
            Err(e) => {
                debug!("Index has no pages: {}", e);
                Vec::new()
            }
        };
        titles.retain(|t| !self.excluded.contains(t));
        titles.sort();
        titles
    }

    /// `<ul>` of links to every page under `base_url`, or "No pages"
    pub fn auto_index(&self, base_url: &str) -> Markup {
        let titles = self.titles();
        if titles.is_empty() {
            return Markup::new(NO_PAGES);
        }

        let base = escape_attr(base_url);
        let mut html = String::from("<ul>");
        for title in &titles {
            html.push_str(&format!(
                "<li><a href=\"{}{}\">{}</a></li>",
                base,
                escape_attr(title),
                escape_html(title)
            ));
        }
        html.push_str("</ul>");
        Markup::new(html)
    }
}
