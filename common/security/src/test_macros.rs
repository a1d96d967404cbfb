//! Shared test helper macro for attaching a bearer token to a request.
//! Usage: with_bearer!(req, token);
#[macro_export]
macro_rules! with_bearer {
    ($req:expr, $token:expr) => {{
        let value = format!("Bearer {}", $token);
        $req.headers_mut().insert(
            ::axum::http::header::AUTHORIZATION,
            ::axum::http::HeaderValue::from_str(&value).unwrap(),
        );
    }};
}
