// src/middleware/cache.rs

use axum::{
    http::{header, HeaderValue},
    response::Response,
};

/// Relatórios podem ficar 5 minutos no cache do navegador.
pub const REPORT_CACHE: &str = "private, max-age=300";
pub const NO_STORE: &str = "no-store";

// Respostas de CRUD nunca são reaproveitadas; o handler pode sobrescrever
pub async fn no_store(mut response: Response) -> Response {
    response
        .headers_mut()
        .entry(header::CACHE_CONTROL)
        .or_insert(HeaderValue::from_static(NO_STORE));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn test_no_store_is_default() {
        let response = no_store("ok".into_response()).await;
        assert_eq!(response.headers()[header::CACHE_CONTROL], NO_STORE);
    }

    #[tokio::test]
    async fn test_handler_cache_header_wins() {
        let response = ([(header::CACHE_CONTROL, REPORT_CACHE)], "ok").into_response();
        let response = no_store(response).await;
        assert_eq!(response.headers()[header::CACHE_CONTROL], REPORT_CACHE);
    }
}
