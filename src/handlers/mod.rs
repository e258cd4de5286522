//! API handlers, grouped per resource

pub mod admin;
pub mod auth;
pub mod content;
pub mod payments;
pub mod picks;
pub mod plans;
pub mod support;
pub mod users;
pub mod withdrawals;

use axum::http::HeaderMap;

/// Requester metadata recorded with moderated submissions for audit.
pub(crate) fn client_meta(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|v| v.to_string());
    (ip, user_agent)
}
