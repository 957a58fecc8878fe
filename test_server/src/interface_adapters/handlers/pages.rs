use crate::domain::{TestCatalog, UserProvider};
use crate::interface_adapters::render;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{PageError, PageMetadata, TestPageUseCase};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;

// Extract the session token from an `Authorization: Bearer` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn page_use_case(state: &AppState) -> TestPageUseCase<Arc<dyn UserProvider>, Arc<dyn TestCatalog>> {
    TestPageUseCase {
        users: state.users.clone(),
        catalog: state.catalog.clone(),
    }
}

#[tracing::instrument(name = "test_page", skip_all, fields(slug = %slug))]
pub async fn test_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    let use_case = page_use_case(&state);

    match use_case.render(&slug, bearer_token(&headers)).await {
        Ok(page) => {
            tracing::info!(is_authenticated = page.is_authenticated, "test page rendered.");
            Html(render::test_page(&page)).into_response()
        }
        Err(PageError::NotFound) => {
            (StatusCode::NOT_FOUND, Html(render::not_found_page())).into_response()
        }
    }
}

#[tracing::instrument(name = "test_metadata", skip_all, fields(slug = %slug))]
pub async fn test_metadata(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Json<PageMetadata> {
    Json(page_use_case(&state).metadata(&slug).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn when_header_is_bearer_then_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));

        assert_eq!(bearer_token(&headers), Some("abc"));
    }

    #[test]
    fn when_header_uses_other_scheme_then_no_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));

        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
