//! Product feed domain types and wire conversion.
//!
//! The external feed is JSON with camelCase keys. Wire structs deserialize
//! exactly what the feed sends; conversion into domain types validates the
//! invariants the feed does not guarantee (non-negative price and quantity).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use greengrocer_core::{ProductId, SaleId};

use super::FeedError;

/// A product from the external feed (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Feed-assigned identifier.
    pub id: ProductId,
    /// Short description, shown in listings and matched by search.
    pub description: String,
    /// Category name; the distinct set is derived from the full list.
    pub category: String,
    /// Current sale price.
    pub sale_price: Decimal,
    /// Image URL.
    pub image: String,
}

/// A recorded sale for a product (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    /// Feed-assigned identifier.
    pub id: SaleId,
    /// Unit price at the time of sale. Non-negative.
    pub price: Decimal,
    /// Units sold. Non-negative.
    pub quantity: u32,
    /// Day of the sale.
    pub date: NaiveDate,
    /// Product this sale belongs to, if the feed linked it.
    pub product_id: Option<ProductId>,
}

/// Wire format of a feed product.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FeedProduct {
    id: i64,
    description: String,
    category: String,
    sale_price: Decimal,
    image: String,
}

impl TryFrom<FeedProduct> for Product {
    type Error = FeedError;

    fn try_from(wire: FeedProduct) -> Result<Self, Self::Error> {
        if wire.sale_price.is_sign_negative() {
            return Err(FeedError::Data(format!(
                "product {} has negative price {}",
                wire.id, wire.sale_price
            )));
        }

        Ok(Self {
            id: ProductId::new(wire.id),
            description: wire.description,
            category: wire.category,
            sale_price: wire.sale_price,
            image: wire.image,
        })
    }
}

/// Wire format of a feed sale.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FeedSale {
    sale_id: i64,
    sale_price: Decimal,
    sale_qty: i64,
    sale_date: NaiveDate,
    #[serde(default)]
    product_id: Option<i64>,
}

impl TryFrom<FeedSale> for Sale {
    type Error = FeedError;

    fn try_from(wire: FeedSale) -> Result<Self, Self::Error> {
        if wire.sale_price.is_sign_negative() {
            return Err(FeedError::Data(format!(
                "sale {} has negative price {}",
                wire.sale_id, wire.sale_price
            )));
        }

        let quantity = u32::try_from(wire.sale_qty).map_err(|_| {
            FeedError::Data(format!(
                "sale {} has invalid quantity {}",
                wire.sale_id, wire.sale_qty
            ))
        })?;

        Ok(Self {
            id: SaleId::new(wire.sale_id),
            price: wire.sale_price,
            quantity,
            date: wire.sale_date,
            product_id: wire.product_id.map(ProductId::new),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_wire_conversion() {
        let wire: FeedProduct = serde_json::from_str(
            r#"{"id": 3, "description": "Golden Apple", "category": "fruit",
                "salePrice": 4.5, "image": "https://feed.example/apple.png"}"#,
        )
        .unwrap();
        let product = Product::try_from(wire).unwrap();
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.sale_price, Decimal::new(45, 1));
        assert_eq!(product.category, "fruit");
    }

    #[test]
    fn test_product_rejects_negative_price() {
        let wire: FeedProduct = serde_json::from_str(
            r#"{"id": 3, "description": "x", "category": "fruit",
                "salePrice": -1, "image": ""}"#,
        )
        .unwrap();
        assert!(matches!(Product::try_from(wire), Err(FeedError::Data(_))));
    }

    #[test]
    fn test_sale_wire_conversion() {
        let wire: FeedSale = serde_json::from_str(
            r#"{"saleId": 10, "salePrice": 2.25, "saleQty": 4,
                "saleDate": "2024-06-01", "productId": 3}"#,
        )
        .unwrap();
        let sale = Sale::try_from(wire).unwrap();
        assert_eq!(sale.quantity, 4);
        assert_eq!(sale.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(sale.product_id, Some(ProductId::new(3)));
    }

    #[test]
    fn test_sale_allows_missing_product_reference() {
        // The feed may orphan a sale
        let wire: FeedSale = serde_json::from_str(
            r#"{"saleId": 11, "salePrice": 1, "saleQty": 1, "saleDate": "2024-06-02"}"#,
        )
        .unwrap();
        let sale = Sale::try_from(wire).unwrap();
        assert_eq!(sale.product_id, None);
    }

    #[test]
    fn test_sale_rejects_negative_quantity() {
        let wire: FeedSale = serde_json::from_str(
            r#"{"saleId": 12, "salePrice": 1, "saleQty": -2, "saleDate": "2024-06-02"}"#,
        )
        .unwrap();
        assert!(matches!(Sale::try_from(wire), Err(FeedError::Data(_))));
    }
}
