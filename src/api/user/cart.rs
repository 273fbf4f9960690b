use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::entities::{
    cart::{self, Entity as CartEntity},
    cart_item::{self, Entity as CartItemEntity},
    product::{self, Entity as ProductEntity},
};
use crate::error::ApiError;
use crate::middleware::auth::Claims;

pub fn cart_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:id", put(update_quantity).delete(remove_item))
        .layer(Extension(db))
}

//Find-or-create cart, then find-or-increment the line item, all inside one
//transaction. The unique indexes on carts.user_id and
//cart_items(cart_id, product_id) turn a lost race into a failed transaction.
async fn add_item(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddItem>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.quantity == 0 {
        return Err(ApiError::InvalidState(
            "Quantity must be greater than 0".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let product = ProductEntity::find_by_id(payload.product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    let cart = match CartEntity::find()
        .filter(cart::Column::UserId.eq(claims.user_id))
        .one(&txn)
        .await?
    {
        Some(cart) => cart,
        None => {
            cart::ActiveModel {
                user_id: Set(claims.user_id),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    let existing = CartItemEntity::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .filter(cart_item::Column::ProductId.eq(payload.product_id))
        .one(&txn)
        .await?;

    let item = match existing {
        Some(entry) => {
            let mut entry: cart_item::ActiveModel = entry.into();
            entry.quantity = Set(entry.quantity.unwrap() + payload.quantity);
            entry.update(&txn).await?
        }
        None => {
            cart_item::ActiveModel {
                cart_id: Set(cart.id),
                product_id: Set(payload.product_id),
                quantity: Set(payload.quantity),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(CartItemResponse::new(item, product)),
    ))
}

async fn get_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = CartEntity::find()
        .filter(cart::Column::UserId.eq(claims.user_id))
        .one(&*db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cart not found".to_string()))?;

    let cart_items = load_cart_items(&*db, cart.id).await?;

    Ok(Json(CartResponse {
        id: cart.id,
        user_id: cart.user_id,
        cart_items,
    }))
}

async fn remove_item(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let txn = db.begin().await?;

    let (cart, item) = find_owned_item(&txn, claims.user_id, id).await?;

    let item: cart_item::ActiveModel = item.into();
    item.delete(&txn).await?;

    //A cart never survives empty: dropping the last item drops the cart too,
    //so the next get_cart reports NotFound rather than an empty cart.
    let remaining = CartItemEntity::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .one(&txn)
        .await?;
    if remaining.is_none() {
        let cart: cart::ActiveModel = cart.into();
        cart.delete(&txn).await?;
    }

    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn update_quantity(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateQuantity>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.quantity == 0 {
        return Err(ApiError::InvalidState(
            "Quantity must be greater than 0".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let (_, item) = find_owned_item(&txn, claims.user_id, id).await?;

    let product = ProductEntity::find_by_id(item.product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| {
            sea_orm::DbErr::RecordNotFound("cart item references a missing product".to_string())
        })?;

    let mut item: cart_item::ActiveModel = item.into();
    item.quantity = Set(payload.quantity);
    let updated = item.update(&txn).await?;

    txn.commit().await?;

    Ok(Json(CartItemResponse::new(updated, product)))
}

//The item lookup is scoped to the caller's cart, so another user's item id
//comes back as NotFound.
async fn find_owned_item<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    item_id: i32,
) -> Result<(cart::Model, cart_item::Model), ApiError> {
    let cart = CartEntity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cart not found".to_string()))?;

    let item = CartItemEntity::find_by_id(item_id)
        .filter(cart_item::Column::CartId.eq(cart.id))
        .one(conn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cart item not found".to_string()))?;

    Ok((cart, item))
}

//Explicit composed read: line items joined with their products, assembled
//into the response shape by hand.
pub async fn load_cart_items<C: ConnectionTrait>(
    conn: &C,
    cart_id: i32,
) -> Result<Vec<CartItemResponse>, ApiError> {
    let rows = CartItemEntity::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .find_also_related(ProductEntity)
        .all(conn)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for (item, maybe_product) in rows {
        let product = maybe_product.ok_or_else(|| {
            sea_orm::DbErr::RecordNotFound("cart item references a missing product".to_string())
        })?;
        items.push(CartItemResponse::new(item, product));
    }

    Ok(items)
}

#[derive(Deserialize, Debug)]
struct AddItem {
    product_id: i32,
    quantity: u32,
}

#[derive(Deserialize)]
struct UpdateQuantity {
    quantity: u32,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub id: i32,
    pub product_id: i32,
    pub quantity: u32,
    pub product: product::Model,
}

impl CartItemResponse {
    fn new(item: cart_item::Model, product: product::Model) -> CartItemResponse {
        CartItemResponse {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            product,
        }
    }
}

#[derive(Serialize)]
pub struct CartResponse {
    pub id: i32,
    pub user_id: i32,
    pub cart_items: Vec<CartItemResponse>,
}
