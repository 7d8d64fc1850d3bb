//! Product catalog endpoints and manual stock adjustment.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::ProductId;
use orders::OrderStore;
use stock::{NewProduct, Product, ProductUpdate, StockStore};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub image_url: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub stock_quantity: Option<i64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub stock_quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub product_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn product_response(product: Product) -> ProductResponse {
    ProductResponse {
        product_id: product.id.as_i64(),
        name: product.name,
        description: product.description,
        price_cents: product.price_cents,
        stock_quantity: product.stock_quantity,
        image_url: product.image_url,
        created_at: product.created_at,
        updated_at: product.updated_at,
    }
}

// -- Handlers --

/// POST /products — create a product.
#[tracing::instrument(skip(state, req))]
pub async fn create<O: OrderStore + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<O, S>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state
        .stock
        .create_product(NewProduct {
            name: req.name,
            description: req.description,
            price_cents: req.price_cents,
            stock_quantity: req.stock_quantity,
            image_url: req.image_url,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(product_response(product))))
}

/// GET /products — list all products.
#[tracing::instrument(skip(state))]
pub async fn list<O: OrderStore + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<O, S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.stock.list_products().await?;
    Ok(Json(products.into_iter().map(product_response).collect()))
}

/// GET /products/{id} — load one product.
#[tracing::instrument(skip(state))]
pub async fn get<O: OrderStore + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<O, S>>>,
    Path(id): Path<i64>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .stock
        .get_product(ProductId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    Ok(Json(product_response(product)))
}

/// PUT /products/{id} — partial update; only provided fields change.
#[tracing::instrument(skip(state, req))]
pub async fn update<O: OrderStore + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<O, S>>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .stock
        .update_product(
            ProductId::new(id),
            ProductUpdate {
                name: req.name,
                description: req.description,
                price_cents: req.price_cents,
                stock_quantity: req.stock_quantity,
                image_url: req.image_url,
            },
        )
        .await?;

    Ok(Json(product_response(product)))
}

/// DELETE /products/{id} — remove a product.
#[tracing::instrument(skip(state))]
pub async fn delete<O: OrderStore + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<O, S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.stock.delete_product(ProductId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /products/{id}/stock — manual stock adjustment.
///
/// Administrative path; order-driven deductions go through the broker and
/// the locked deduction instead.
#[tracing::instrument(skip(state))]
pub async fn update_stock<O: OrderStore + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<O, S>>>,
    Path(id): Path<i64>,
    Query(query): Query<StockQuery>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .stock
        .set_stock(ProductId::new(id), query.stock_quantity)
        .await?;

    Ok(Json(product_response(product)))
}
