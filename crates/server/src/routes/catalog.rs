//! Catalog route handlers.
//!
//! Filtering and pagination run server-side over the cached feed list.
//! Per-sale detail and the revenue series are gated on the session role;
//! everyone else gets totals only.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use greengrocer_core::ProductId;

use crate::catalog::{
    ProductFilter, distinct_categories, filter_products, paginate, revenue_series, summarize_sales,
};
use crate::error::{AppError, Result};
use crate::feed::{Product, Sale};
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Catalog filter and pagination query parameters.
///
/// Empty strings mean "no filter", matching the SPA's select defaults.
#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
}

/// Product listing response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    pub categories: Vec<String>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Per-product sales response. `sales` and `series` are present only for
/// roles that pass the manager gate.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSalesResponse {
    pub product_id: ProductId,
    pub total_price: Decimal,
    pub total_quantity: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales: Option<Vec<Sale>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<SeriesPoint>>,
}

/// One point of the daily revenue series.
#[derive(Debug, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub revenue: Decimal,
}

/// Filtered, paginated product listing.
///
/// GET /api/catalog/products?category=&price=&q=&page=
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<ProductsResponse>> {
    let price = match query.price.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse()
                .map_err(|e: crate::catalog::PriceBucketParseError| {
                    AppError::BadRequest(e.to_string())
                })?,
        ),
        None => None,
    };

    let filter = ProductFilter {
        category: query.category.filter(|s| !s.is_empty()),
        price,
        search: query.q.filter(|s| !s.is_empty()),
    };

    let all_products = state.feed().products().await?;

    let categories = distinct_categories(&all_products);
    let filtered = filter_products(&all_products, &filter);
    let page = paginate(filtered, query.page.unwrap_or(1));

    Ok(Json(ProductsResponse {
        products: page.products.into_iter().cloned().collect(),
        categories,
        page: page.page,
        total_pages: page.total_pages,
        total: page.total,
    }))
}

/// Sales history for one product, reduced to totals; per-sale rows and the
/// revenue series only for managers.
///
/// GET /api/catalog/products/{id}/sales
pub async fn product_sales(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<ProductSalesResponse>> {
    let product_id = ProductId::new(id);
    let sales = state.feed().product_sales(product_id).await?;

    let summary = summarize_sales(&sales);

    let can_view_detail = user.is_some_and(|u| u.role.can_view_sales_detail());

    let (detail, series) = if can_view_detail {
        let series = revenue_series(&sales)
            .into_iter()
            .map(|(date, revenue)| SeriesPoint { date, revenue })
            .collect();
        (Some(sales), Some(series))
    } else {
        (None, None)
    };

    Ok(Json(ProductSalesResponse {
        product_id,
        total_price: summary.total_price,
        total_quantity: summary.total_quantity,
        sales: detail,
        series,
    }))
}
