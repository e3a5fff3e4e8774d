use std::marker::PhantomData;
use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, Form, FromRequest, FromRequestParts, Multipart, Query, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderName, StatusCode, Uri},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use log::{error, info};
use serde::Deserialize;

use crate::errors::WikiError;
use crate::routes::Action;
use crate::types::{AppState, Page};

/// Ties a handler to the action its path must name
pub trait RoutedAction {
    const ACTION: Action;
}

pub struct ViewAction;
pub struct EditAction;
pub struct SaveAction;

impl RoutedAction for ViewAction {
    const ACTION: Action = Action::View;
}

impl RoutedAction for EditAction {
    const ACTION: Action = Action::Edit;
}

impl RoutedAction for SaveAction {
    const ACTION: Action = Action::Save;
}

/// Title taken from a `/<action>/<title>` path that passed validation for action `A`.
///
/// Rejects with a 404 before any handler code or body parsing runs.
pub struct ValidTitle<A>(pub String, PhantomData<A>);

#[async_trait]
impl<A: RoutedAction + Send + Sync + 'static> FromRequestParts<AppState> for ValidTitle<A> {
    type Rejection = WikiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path();
        match state.router.title_for(A::ACTION, path) {
            Ok(title) => Ok(ValidTitle(title, PhantomData)),
            Err(e) => {
                error!("Getting {} title from URL {}", A::ACTION, path);
                Err(e)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveForm {
    #[serde(default)]
    pub body: Option<String>,
}

/// The submitted `body` field.
///
/// Read from a url-encoded or multipart body, falling back to the query
/// string. A missing field is an empty body.
pub struct SaveBody(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for SaveBody {
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<SaveForm>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(form)| form.body);
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let posted = if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            let mut body = None;
            while let Some(field) = multipart.next_field().await.map_err(IntoResponse::into_response)? {
                if field.name() == Some("body") {
                    body = Some(field.text().await.map_err(IntoResponse::into_response)?);
                    break;
                }
            }
            body
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<SaveForm>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            form.body
        } else {
            None
        };

        Ok(SaveBody(posted.or(query).unwrap_or_default()))
    }
}

/// Log every request the way an access log would
pub async fn log_request(req: Request, next: Next) -> Response {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    info!(
        "{} {:?} {} {} {} {}",
        remote,
        req.version(),
        req.method(),
        req.uri(),
        header_value(req.headers(), &header::USER_AGENT),
        header_value(req.headers(), &header::REFERER),
    );
    next.run(req).await
}

fn header_value(headers: &HeaderMap, name: &HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

/// `//<host>/view/`, the prefix generated links point at
fn view_base_url(headers: &HeaderMap, uri: &Uri) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("");
    format!("//{}{}", host, Action::View.path_for(""))
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Handle root path requests: the front page
pub async fn handle_root(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, WikiError> {
    let front_page = state.config.front_page.clone();
    view_page(&state, &front_page, &view_base_url(&headers, &uri))
}

pub async fn handle_view(
    State(state): State<AppState>,
    ValidTitle(title, _): ValidTitle<ViewAction>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, WikiError> {
    view_page(&state, &title, &view_base_url(&headers, &uri))
}

fn view_page(state: &AppState, title: &str, base_url: &str) -> Result<Response, WikiError> {
    match state.store.load(title) {
        Ok(page) => Ok(Html(state.templates.render("view", &page, base_url)?).into_response()),
        Err(WikiError::NotFound) => Ok(redirect(&Action::Edit.path_for(title))),
        Err(e) => Err(e),
    }
}

pub async fn handle_edit(
    State(state): State<AppState>,
    ValidTitle(title, _): ValidTitle<EditAction>,
) -> Result<Response, WikiError> {
    let page = match state.store.load(&title) {
        Ok(page) => page,
        Err(WikiError::NotFound) => {
            info!("Creating {}", title);
            Page::empty(title)
        }
        Err(e) => return Err(e),
    };
    Ok(Html(state.templates.render("edit", &page, "")?).into_response())
}

pub async fn handle_save(
    State(state): State<AppState>,
    ValidTitle(title, _): ValidTitle<SaveAction>,
    SaveBody(body): SaveBody,
) -> Result<Response, WikiError> {
    let page = Page::new(title, body);
    state.store.save(&page)?;
    Ok(redirect(&Action::View.path_for(&page.title)))
}

pub async fn handle_not_found(uri: Uri) -> WikiError {
    error!("Getting title from URL {}", uri.path());
    WikiError::InvalidTitle(uri.path().to_string())
}
