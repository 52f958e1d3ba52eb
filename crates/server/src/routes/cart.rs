//! Cart route handlers.
//!
//! The cart is an ordered sequence of lines in the server-side session.
//! Adding the same product twice appends two lines; removal drops every
//! line with the product id. Nothing is persisted beyond the session.

use axum::{
    Json,
    extract::State,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use greengrocer_core::ProductId;

use crate::error::{AppError, Result};
use crate::models::session_keys;
use crate::state::AppState;

/// One cart line: a snapshot of the product at the time it was added.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub description: String,
    pub sale_price: Decimal,
    pub image: String,
}

/// Cart contents response.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartLine>,
    pub count: usize,
}

/// Request body naming a product.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: ProductId,
}

/// Read the cart from the session.
async fn read_cart(session: &Session) -> Result<Vec<CartLine>> {
    Ok(session
        .get::<Vec<CartLine>>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Write the cart back to the session.
async fn write_cart(session: &Session, cart: &[CartLine]) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

/// Cart contents.
///
/// GET /api/cart
pub async fn show(session: Session) -> Result<Json<CartResponse>> {
    let items = read_cart(&session).await?;
    let count = items.len();
    Ok(Json(CartResponse { items, count }))
}

/// Append a product to the cart.
///
/// POST /api/cart/add
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CartItemRequest>,
) -> Result<Json<CartResponse>> {
    let products = state.feed().products().await?;

    let product = products
        .iter()
        .find(|p| p.id == req.product_id)
        .ok_or_else(|| AppError::NotFound(format!("product {}", req.product_id)))?;

    let mut items = read_cart(&session).await?;
    items.push(CartLine {
        product_id: product.id,
        description: product.description.clone(),
        sale_price: product.sale_price,
        image: product.image.clone(),
    });
    write_cart(&session, &items).await?;

    let count = items.len();
    Ok(Json(CartResponse { items, count }))
}

/// Remove every line with the given product id.
///
/// POST /api/cart/remove
pub async fn remove(
    session: Session,
    Json(req): Json<CartItemRequest>,
) -> Result<Json<CartResponse>> {
    let mut items = read_cart(&session).await?;
    items.retain(|line| line.product_id != req.product_id);
    write_cart(&session, &items).await?;

    let count = items.len();
    Ok(Json(CartResponse { items, count }))
}

/// Empty the cart.
///
/// POST /api/cart/clear
pub async fn clear(session: Session) -> Result<Json<CartResponse>> {
    write_cart(&session, &[]).await?;
    Ok(Json(CartResponse {
        items: Vec::new(),
        count: 0,
    }))
}
