use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};

use crate::error::{AuthError, AuthResult};

/// Pull the bearer token out of the request headers.
///
/// A missing header yields `Ok(None)`; whether that is acceptable is a policy decision.
/// A header that is present but not a usable `Bearer` credential is malformed.
pub fn bearer_token(headers: &HeaderMap) -> AuthResult<Option<String>> {
    match headers.get(AUTHORIZATION) {
        Some(value) => parse_bearer(value).map(Some),
        None => Ok(None),
    }
}

pub fn parse_bearer(value: &HeaderValue) -> AuthResult<String> {
    let raw = value.to_str().map_err(|_| AuthError::Malformed)?.trim();

    let (scheme, token) = raw.split_once(' ').ok_or(AuthError::Malformed)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Malformed);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Malformed);
    }

    Ok(token.to_owned())
}
