use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;

use crate::entities::{
    cart::{self, Entity as CartEntity},
    cart_item::{self, Entity as CartItemEntity},
    order::{self, Entity as OrderEntity},
    order_item::{self, Entity as OrderItemEntity},
    product::{self, Entity as ProductEntity},
};
use crate::error::ApiError;
use crate::middleware::auth::Claims;

pub fn order_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order))
        .layer(Extension(db))
}

//Consumes the caller's cart: totals it at current catalog prices, freezes
//each line into an order item, then deletes the cart items and the cart row
//itself. Commit-all or fail-all, nothing partial survives.
async fn create_order(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let txn = db.begin().await?;

    let cart = CartEntity::find()
        .filter(cart::Column::UserId.eq(claims.user_id))
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::InvalidState("Cart is empty".to_string()))?;

    let rows = CartItemEntity::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .find_also_related(ProductEntity)
        .all(&txn)
        .await?;

    if rows.is_empty() {
        return Err(ApiError::InvalidState("Cart is empty".to_string()));
    }

    let mut total_amount = 0.0_f32;
    for (item, maybe_product) in &rows {
        let product = maybe_product.as_ref().ok_or_else(|| {
            sea_orm::DbErr::RecordNotFound("cart item references a missing product".to_string())
        })?;
        total_amount += product.price * item.quantity as f32;
    }

    let new_order = order::ActiveModel {
        user_id: Set(claims.user_id),
        order_date: Set(Utc::now()),
        total_amount: Set(total_amount),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut order_items = Vec::with_capacity(rows.len());
    for (item, maybe_product) in rows {
        let product = maybe_product.ok_or_else(|| {
            sea_orm::DbErr::RecordNotFound("cart item references a missing product".to_string())
        })?;

        let placed = order_item::ActiveModel {
            order_id: Set(new_order.id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            price_at_order: Set(product.price),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        order_items.push(OrderItemResponse::new(placed, product));
    }

    CartItemEntity::delete_many()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .exec(&txn)
        .await?;
    let cart: cart::ActiveModel = cart.into();
    cart.delete(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = new_order.id,
        user_id = claims.user_id,
        total_amount,
        "placed order"
    );

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::new(new_order, order_items)),
    ))
}

async fn list_orders(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = OrderEntity::find()
        .filter(order::Column::UserId.eq(claims.user_id))
        .order_by_asc(order::Column::Id)
        .all(&*db)
        .await?;

    let mut response = Vec::with_capacity(orders.len());
    for placed in orders {
        let order_items = load_order_items(&*db, placed.id).await?;
        response.push(OrderResponse::new(placed, order_items));
    }

    Ok(Json(response))
}

async fn get_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    //Scoped to the caller, so someone else's order id is a plain NotFound.
    let placed = OrderEntity::find_by_id(id)
        .filter(order::Column::UserId.eq(claims.user_id))
        .one(&*db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    let order_items = load_order_items(&*db, placed.id).await?;

    Ok(Json(OrderResponse::new(placed, order_items)))
}

async fn load_order_items<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<Vec<OrderItemResponse>, ApiError> {
    let rows = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .find_also_related(ProductEntity)
        .all(conn)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for (item, maybe_product) in rows {
        let product = maybe_product.ok_or_else(|| {
            sea_orm::DbErr::RecordNotFound("order item references a missing product".to_string())
        })?;
        items.push(OrderItemResponse::new(item, product));
    }

    Ok(items)
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: i32,
    pub product_id: i32,
    pub quantity: u32,
    pub price_at_order: f32,
    pub product: product::Model,
}

impl OrderItemResponse {
    fn new(item: order_item::Model, product: product::Model) -> OrderItemResponse {
        OrderItemResponse {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            price_at_order: item.price_at_order,
            product,
        }
    }
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: i32,
    pub user_id: i32,
    pub order_date: chrono::DateTime<Utc>,
    pub total_amount: f32,
    pub order_items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    fn new(placed: order::Model, order_items: Vec<OrderItemResponse>) -> OrderResponse {
        OrderResponse {
            id: placed.id,
            user_id: placed.user_id,
            order_date: placed.order_date,
            total_amount: placed.total_amount,
            order_items,
        }
    }
}
