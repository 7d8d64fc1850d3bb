//! Order endpoints: asynchronous admission, queries, manual updates.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{CustomerId, OrderId, OrderLine, OrderStatus};
use orders::{Order, OrderStore, PlaceOrder};
use stock::StockStore;

use crate::AppState;
use crate::catalog::display_name;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: i64,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: i64,
    pub customer_id: i64,
    pub items: Vec<OrderItemResponse>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct AcceptedResponse {
    pub detail: String,
    pub order: OrderResponse,
}

fn order_response(order: Order) -> OrderResponse {
    OrderResponse {
        order_id: order.id.as_i64(),
        customer_id: order.customer_id.as_i64(),
        items: order
            .items
            .iter()
            .map(|line| OrderItemResponse {
                product_id: line.product_id.as_i64(),
                quantity: line.quantity,
                name: None,
            })
            .collect(),
        status: order.status,
        created_at: order.created_at,
        updated_at: order.updated_at,
    }
}

async fn enriched_response(
    order: Order,
    catalog: &dyn crate::catalog::ProductCatalog,
) -> OrderResponse {
    let mut response = order_response(order);
    for item in &mut response.items {
        item.name = Some(display_name(catalog, common::ProductId::new(item.product_id)).await);
    }
    response
}

// -- Handlers --

/// POST /orders — admit an order; stock is reconciled asynchronously.
#[tracing::instrument(skip(state, req))]
pub async fn create<O: OrderStore + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<O, S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let request = PlaceOrder {
        customer_id: req.customer_id.map(CustomerId::new),
        items: req
            .items
            .iter()
            .map(|item| OrderLine::new(item.product_id, item.quantity))
            .collect(),
    };

    let order = state.orders.place_order(request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            detail: "Order received and stock check initiated asynchronously.".to_string(),
            order: order_response(order),
        }),
    ))
}

/// GET /orders — list orders with product names resolved.
#[tracing::instrument(skip(state))]
pub async fn list<O: OrderStore + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<O, S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let all = state.orders.list_orders().await?;

    let mut responses = Vec::with_capacity(all.len());
    for order in all {
        responses.push(enriched_response(order, state.catalog.as_ref()).await);
    }
    Ok(Json(responses))
}

/// GET /orders/{id} — load one order.
#[tracing::instrument(skip(state))]
pub async fn get<O: OrderStore + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<O, S>>>,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .get_order(OrderId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    Ok(Json(enriched_response(order, state.catalog.as_ref()).await))
}

/// PUT /orders/{id} — manual status update (e.g. operator cancellation).
#[tracing::instrument(skip(state, req))]
pub async fn update<O: OrderStore + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<O, S>>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|e: common::status::UnknownStatus| ApiError::Validation(e.to_string()))?;

    let order = state.orders.update_status(OrderId::new(id), status).await?;
    Ok(Json(order_response(order)))
}

/// DELETE /orders/{id} — remove an order.
#[tracing::instrument(skip(state))]
pub async fn delete<O: OrderStore + 'static, S: StockStore + 'static>(
    State(state): State<Arc<AppState<O, S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.orders.delete_order(OrderId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
