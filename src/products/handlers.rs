use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    error::ApiError,
    products::{
        dto::{CreateProductRequest, MessageResponse, ProductEnvelope, UpdateProductRequest},
        repo_types::Product,
        services::{
            self, parse_id, MSG_CREATED, MSG_DELETED, MSG_FIELDS_REQUIRED, MSG_INVALID_BODY,
            MSG_UPDATED,
        },
    },
    state::AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = services::list_active(state.products.as_ref()).await?;
    Ok(Json(products))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductEnvelope>), ApiError> {
    let Json(body) = payload.map_err(|e| reject_body(e, MSG_FIELDS_REQUIRED))?;
    let producto = services::create(state.products.as_ref(), body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductEnvelope {
            message: MSG_CREATED.into(),
            producto,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_id(&raw_id)?;
    let product = services::get_one(state.products.as_ref(), id).await?;
    Ok(Json(product))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Bytes,
) -> Result<Json<ProductEnvelope>, ApiError> {
    let id = parse_id(&raw_id)?;
    let body = update_body(&payload);
    let producto = services::update(state.products.as_ref(), id, body).await?;
    Ok(Json(ProductEnvelope {
        message: MSG_UPDATED.into(),
        producto,
    }))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    services::delete(state.products.as_ref(), id).await?;
    Ok(Json(MessageResponse {
        message: MSG_DELETED.into(),
    }))
}

/// An empty body is an update that changes nothing.
fn update_body(payload: &[u8]) -> Result<UpdateProductRequest, ApiError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(UpdateProductRequest::default());
    }
    serde_json::from_slice(payload).map_err(|e| {
        warn!(error = %e, "rejected request body");
        ApiError::validation(MSG_INVALID_BODY)
    })
}

fn reject_body(rejection: JsonRejection, message: &str) -> ApiError {
    warn!(error = %rejection.body_text(), "rejected request body");
    ApiError::validation(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_body_changes_nothing() {
        for payload in [&b""[..], &b"  \n"[..]] {
            let req = update_body(payload).expect("empty body");
            assert!(req.name.is_none() && req.price.is_none());
            assert!(req.stock.is_none() && req.category.is_none());
        }
    }

    #[test]
    fn update_body_decodes_or_rejects() {
        let req = update_body(br#"{"stock": 3, "name": "B"}"#).expect("valid body");
        assert_eq!(req.stock, Some(3));
        assert_eq!(req.name.as_deref(), Some("B"));

        let err = update_body(b"{").unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == MSG_INVALID_BODY));
    }
}
