use std::fmt;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use regex::Regex;

use crate::errors::WikiError;
use crate::handlers;
use crate::types::AppState;

const PATH_PATTERN: &str = r"^/(edit|save|view)/([a-zA-Z0-9]+)/?$";

/// What a request wants to do with a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Edit,
    Save,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Save => "save",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "view" => Some(Action::View),
            "edit" => Some(Action::Edit),
            "save" => Some(Action::Save),
            _ => None,
        }
    }

    /// Path addressing `title` with this action
    pub fn path_for(&self, title: &str) -> String {
        format!("/{}/{}", self.as_str(), title)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated `/<action>/<title>` request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub action: Action,
    pub title: String,
}

/// Validates request paths and extracts the page title
#[derive(Debug, Clone)]
pub struct PathRouter {
    pattern: Regex,
}

impl PathRouter {
    pub fn new() -> Result<Self, WikiError> {
        let pattern = Regex::new(PATH_PATTERN)
            .map_err(|e| WikiError::TemplateError(format!("invalid path pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Match `path` against `/<action>/<title>` with an optional trailing slash
    pub fn parse(&self, path: &str) -> Result<Route, WikiError> {
        let invalid = || WikiError::InvalidTitle(path.to_string());
        let caps = self.pattern.captures(path).ok_or_else(invalid)?;
        let action = Action::from_segment(&caps[1]).ok_or_else(invalid)?;
        Ok(Route { action, title: caps[2].to_string() })
    }

    /// Like `parse`, but the path must address `action`
    pub fn title_for(&self, action: Action, path: &str) -> Result<String, WikiError> {
        let route = self.parse(path)?;
        if route.action != action {
            return Err(WikiError::InvalidTitle(path.to_string()));
        }
        Ok(route.title)
    }
}

/// Assemble the HTTP surface around `state`
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::handle_root))
        .route("/view/*title", get(handlers::handle_view))
        .route("/edit/*title", get(handlers::handle_edit))
        .route("/save/*title", post(handlers::handle_save))
        .fallback(handlers::handle_not_found)
        .layer(middleware::from_fn(handlers::log_request))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> PathRouter {
        PathRouter::new().unwrap()
    }

    #[test]
    fn extracts_action_and_title() {
        assert_eq!(
            router().parse("/view/FrontPage").unwrap(),
            Route { action: Action::View, title: "FrontPage".into() }
        );
        assert_eq!(router().parse("/save/abc123/").unwrap().action, Action::Save);
        assert_eq!(router().title_for(Action::Edit, "/edit/Page2").unwrap(), "Page2");
    }

    #[test]
    fn rejects_malformed_titles() {
        for path in [
            "/view/",
            "/view",
            "/view/../etc",
            "/view/a/b",
            "/view/a.md",
            "/view/under_score",
            "/view/caf\u{e9}",
            "/view/a%2Fb",
            "/view/a//",
            "/delete/Page",
            "/",
            "",
        ] {
            assert!(
                matches!(router().parse(path), Err(WikiError::InvalidTitle(_))),
                "{:?} should be rejected",
                path
            );
        }
    }

    #[test]
    fn title_for_checks_the_action() {
        assert!(router().title_for(Action::View, "/edit/Page").is_err());
    }

    #[test]
    fn path_for_builds_redirect_targets() {
        assert_eq!(Action::Edit.path_for("invalid"), "/edit/invalid");
        assert_eq!(Action::View.to_string(), "view");
    }
}
