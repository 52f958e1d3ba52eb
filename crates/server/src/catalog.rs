//! Catalog view logic.
//!
//! Pure functions over feed data: the distinct category set, the three
//! AND-combined product filters, fixed-size pagination, and the sales
//! reduction. Route handlers stay thin; everything here is testable
//! without a feed.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::feed::{Product, Sale};

/// Products shown per page.
pub const PRODUCTS_PER_PAGE: usize = 8;

/// Price range buckets offered by the catalog filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBucket {
    /// Below 10.
    Below10,
    /// 10 to 20 inclusive.
    Between10And20,
    /// Above 20.
    Above20,
}

impl PriceBucket {
    /// Whether a price falls into this bucket.
    #[must_use]
    pub fn contains(self, price: Decimal) -> bool {
        let ten = Decimal::from(10);
        let twenty = Decimal::from(20);
        match self {
            Self::Below10 => price < ten,
            Self::Between10And20 => price >= ten && price <= twenty,
            Self::Above20 => price > twenty,
        }
    }
}

/// Error parsing a [`PriceBucket`] query value.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown price range '{0}' (expected one of: below10, between10And20, above20)")]
pub struct PriceBucketParseError(pub String);

impl std::str::FromStr for PriceBucket {
    type Err = PriceBucketParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "below10" => Ok(Self::Below10),
            "between10And20" => Ok(Self::Between10And20),
            "above20" => Ok(Self::Above20),
            other => Err(PriceBucketParseError(other.to_owned())),
        }
    }
}

/// Product filter: the three criteria AND-combine; an unset criterion
/// matches everything.
#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Price range bucket.
    pub price: Option<PriceBucket>,
    /// Case-insensitive substring match on the description.
    pub search: Option<String>,
}

impl ProductFilter {
    /// Whether a product passes all set criteria.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let matches_category = self
            .category
            .as_ref()
            .is_none_or(|category| product.category == *category);

        let matches_price = self
            .price
            .is_none_or(|bucket| bucket.contains(product.sale_price));

        let matches_search = self.search.as_ref().is_none_or(|query| {
            product
                .description
                .to_lowercase()
                .contains(&query.to_lowercase())
        });

        matches_category && matches_price && matches_search
    }
}

/// The distinct category set of a product list, sorted.
#[must_use]
pub fn distinct_categories(products: &[Product]) -> Vec<String> {
    let mut categories: Vec<String> = products.iter().map(|p| p.category.clone()).collect();
    categories.sort();
    categories.dedup();
    categories
}

/// Apply a filter to a product list.
#[must_use]
pub fn filter_products<'a>(products: &'a [Product], filter: &ProductFilter) -> Vec<&'a Product> {
    products.iter().filter(|p| filter.matches(p)).collect()
}

/// One page of a filtered product list.
#[derive(Debug)]
pub struct ProductPage<'a> {
    /// Products on this page, in feed order.
    pub products: Vec<&'a Product>,
    /// 1-based page number, clamped to the valid range.
    pub page: usize,
    /// Total number of pages (at least 1).
    pub total_pages: usize,
    /// Total number of products across all pages.
    pub total: usize,
}

/// Paginate a filtered list at [`PRODUCTS_PER_PAGE`].
///
/// Page numbers are 1-based; out-of-range requests clamp to the nearest
/// valid page rather than returning an empty page.
#[must_use]
pub fn paginate<'a>(filtered: Vec<&'a Product>, page: usize) -> ProductPage<'a> {
    let total = filtered.len();
    let total_pages = total.div_ceil(PRODUCTS_PER_PAGE).max(1);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * PRODUCTS_PER_PAGE;
    let products = filtered
        .into_iter()
        .skip(start)
        .take(PRODUCTS_PER_PAGE)
        .collect();

    ProductPage {
        products,
        page,
        total_pages,
        total,
    }
}

/// Totals over a product's sale history.
#[derive(Debug, PartialEq, Eq)]
pub struct SalesSummary {
    /// Sum of price * quantity over all sales.
    pub total_price: Decimal,
    /// Sum of quantities.
    pub total_quantity: u64,
}

/// Reduce a sale history to its totals.
#[must_use]
pub fn summarize_sales(sales: &[Sale]) -> SalesSummary {
    let total_price = sales
        .iter()
        .map(|s| s.price * Decimal::from(s.quantity))
        .sum();
    let total_quantity = sales.iter().map(|s| u64::from(s.quantity)).sum();

    SalesSummary {
        total_price,
        total_quantity,
    }
}

/// Daily revenue series for the manager chart: one point per sale date,
/// ascending.
#[must_use]
pub fn revenue_series(sales: &[Sale]) -> Vec<(NaiveDate, Decimal)> {
    let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for sale in sales {
        *by_date.entry(sale.date).or_default() += sale.price * Decimal::from(sale.quantity);
    }
    by_date.into_iter().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use greengrocer_core::{ProductId, SaleId};

    fn product(id: i64, description: &str, category: &str, price: &str) -> Product {
        Product {
            id: ProductId::new(id),
            description: description.to_string(),
            category: category.to_string(),
            sale_price: price.parse().unwrap(),
            image: format!("https://feed.example/{id}.png"),
        }
    }

    fn sale(id: i64, price: &str, quantity: u32, date: &str) -> Sale {
        Sale {
            id: SaleId::new(id),
            price: price.parse().unwrap(),
            quantity,
            date: date.parse().unwrap(),
            product_id: Some(ProductId::new(1)),
        }
    }

    fn sample_products() -> Vec<Product> {
        vec![
            product(1, "Golden Apple", "fruit", "4.50"),
            product(2, "Red Apple", "fruit", "12.00"),
            product(3, "Baby Spinach", "vegetable", "3.25"),
            product(4, "Dragon Fruit", "fruit", "22.00"),
            product(5, "Sweet Potato", "vegetable", "10.00"),
        ]
    }

    #[test]
    fn test_price_buckets_partition_the_axis() {
        for price in ["0", "9.99", "10", "15", "20", "20.01", "100"] {
            let price: Decimal = price.parse().unwrap();
            let hits = [
                PriceBucket::Below10,
                PriceBucket::Between10And20,
                PriceBucket::Above20,
            ]
            .iter()
            .filter(|b| b.contains(price))
            .count();
            assert_eq!(hits, 1, "price {price} must fall in exactly one bucket");
        }
    }

    #[test]
    fn test_price_bucket_parse() {
        assert_eq!(
            "between10And20".parse::<PriceBucket>().unwrap(),
            PriceBucket::Between10And20
        );
        assert!("cheap".parse::<PriceBucket>().is_err());
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let products = sample_products();
        let filtered = filter_products(&products, &ProductFilter::default());
        assert_eq!(filtered.len(), products.len());
    }

    #[test]
    fn test_filters_and_combine() {
        let products = sample_products();
        let filter = ProductFilter {
            category: Some("fruit".to_string()),
            price: Some(PriceBucket::Below10),
            search: Some("apple".to_string()),
        };
        let filtered = filter_products(&products, &filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].description, "Golden Apple");
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let products = sample_products();
        let filter = ProductFilter {
            search: Some("APPLE".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(filter_products(&products, &filter).len(), 2);
    }

    #[test]
    fn test_category_filter_is_exact() {
        let products = sample_products();
        let filter = ProductFilter {
            category: Some("fru".to_string()),
            ..ProductFilter::default()
        };
        assert!(filter_products(&products, &filter).is_empty());
    }

    #[test]
    fn test_distinct_categories_sorted_and_deduped() {
        let categories = distinct_categories(&sample_products());
        assert_eq!(categories, vec!["fruit", "vegetable"]);
    }

    #[test]
    fn test_paginate_fixed_page_size() {
        let products: Vec<Product> = (1..=20)
            .map(|i| product(i, &format!("Item {i}"), "fruit", "1.00"))
            .collect();
        let refs: Vec<&Product> = products.iter().collect();

        let page1 = paginate(refs.clone(), 1);
        assert_eq!(page1.products.len(), PRODUCTS_PER_PAGE);
        assert_eq!(page1.total_pages, 3);
        assert_eq!(page1.total, 20);

        let page3 = paginate(refs, 3);
        assert_eq!(page3.products.len(), 4);
        assert_eq!(page3.products[0].id, ProductId::new(17));
    }

    #[test]
    fn test_paginate_clamps_out_of_range() {
        let products = sample_products();
        let refs: Vec<&Product> = products.iter().collect();

        assert_eq!(paginate(refs.clone(), 0).page, 1);
        assert_eq!(paginate(refs, 99).page, 1);
    }

    #[test]
    fn test_paginate_empty_list() {
        let page = paginate(Vec::new(), 1);
        assert!(page.products.is_empty());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_summarize_sales() {
        let sales = vec![
            sale(1, "2.50", 4, "2024-06-01"),
            sale(2, "3.00", 2, "2024-06-01"),
            sale(3, "1.00", 10, "2024-06-03"),
        ];
        let summary = summarize_sales(&sales);
        assert_eq!(summary.total_price, "26.00".parse().unwrap());
        assert_eq!(summary.total_quantity, 16);
    }

    #[test]
    fn test_summarize_empty_sales() {
        let summary = summarize_sales(&[]);
        assert_eq!(summary.total_price, Decimal::ZERO);
        assert_eq!(summary.total_quantity, 0);
    }

    #[test]
    fn test_revenue_series_groups_by_date_ascending() {
        let sales = vec![
            sale(3, "1.00", 10, "2024-06-03"),
            sale(1, "2.50", 4, "2024-06-01"),
            sale(2, "3.00", 2, "2024-06-01"),
        ];
        let series = revenue_series(&sales);
        assert_eq!(
            series,
            vec![
                ("2024-06-01".parse().unwrap(), "16.00".parse().unwrap()),
                ("2024-06-03".parse().unwrap(), "10.00".parse().unwrap()),
            ]
        );
    }
}
