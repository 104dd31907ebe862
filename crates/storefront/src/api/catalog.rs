//! Menu, catering services, and site settings.
//!
//! Unfiltered listings are cached for the configured TTL (5 minutes by
//! default). Any filter, search term, or customer email bypasses the cache
//! since `is_in_wishlist` is computed per customer.

use std::borrow::Borrow;
use std::collections::BTreeMap;

use chophouse_core::{
    CateringServiceId, CurrencyCode, Email, Price, ProductId, Purchasable,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::reviews::Review;
use super::{ApiClient, ApiError, Listing};

/// Category value meaning "no category filter".
pub const ALL_CATEGORIES: &str = "all";

// =============================================================================
// Records
// =============================================================================

/// A menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    /// Backend slug, e.g. `finger-foods`, `beverages`, `desserts`.
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub review_count: u32,
    /// Star value (1-5) to number of reviews.
    #[serde(default)]
    pub rating_distribution: BTreeMap<u8, u32>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    /// Only meaningful when the listing was requested with a customer email.
    #[serde(default)]
    pub is_in_wishlist: bool,
}

const fn default_true() -> bool {
    true
}

impl Product {
    /// Unit price tagged with a currency.
    #[must_use]
    pub const fn price_in(&self, currency_code: CurrencyCode) -> Price {
        Price::new(self.price, currency_code)
    }
}

impl Purchasable for Product {
    fn product_id(&self) -> ProductId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn unit_price(&self) -> Decimal {
        self.price
    }
}

/// A catering package shown on the services page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CateringService {
    pub id: CateringServiceId,
    pub name: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub detailed_description: String,
    /// Font Awesome class, e.g. `fas fa-calendar-check`.
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub pricing_info: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Display position; lower first.
    #[serde(default)]
    pub order: u32,
}

/// Restaurant contact details and social links. Blank strings mean unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub phone: String,
    pub email: String,
    pub address: String,
    pub hours: String,
    pub facebook: String,
    pub instagram: String,
    pub twitter: String,
    pub tiktok: String,
    pub youtube: String,
}

impl SiteSettings {
    /// `(network, url)` pairs for every configured social link.
    #[must_use]
    pub fn social_links(&self) -> Vec<(&'static str, &str)> {
        [
            ("facebook", self.facebook.as_str()),
            ("instagram", self.instagram.as_str()),
            ("twitter", self.twitter.as_str()),
            ("tiktok", self.tiktok.as_str()),
            ("youtube", self.youtube.as_str()),
        ]
        .into_iter()
        .filter(|(_, url)| !url.trim().is_empty())
        .collect()
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Sort orders offered on the menu page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Backend order (newest first).
    #[default]
    Featured,
    PriceLowToHigh,
    PriceHighToLow,
    Name,
    Newest,
    Rating,
}

impl ProductSort {
    /// DRF `ordering` parameter, if the backend can sort this way.
    ///
    /// `average_rating` is a computed property, so rating order is applied
    /// client-side with [`sort_products`].
    #[must_use]
    pub const fn as_ordering(self) -> Option<&'static str> {
        match self {
            Self::Featured | Self::Rating => None,
            Self::PriceLowToHigh => Some("price"),
            Self::PriceHighToLow => Some("-price"),
            Self::Name => Some("name"),
            Self::Newest => Some("-created_at"),
        }
    }
}

impl std::str::FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "featured" => Ok(Self::Featured),
            "price_low_to_high" | "price" => Ok(Self::PriceLowToHigh),
            "price_high_to_low" | "-price" => Ok(Self::PriceHighToLow),
            "name" => Ok(Self::Name),
            "newest" => Ok(Self::Newest),
            "rating" => Ok(Self::Rating),
            _ => Err(format!("invalid sort: {s}")),
        }
    }
}

/// Filters for `GET /api/products/`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: ProductSort,
    /// Marks `is_in_wishlist` for this customer.
    pub customer_email: Option<Email>,
}

impl ProductQuery {
    /// Whether this is the plain, cacheable menu listing.
    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        self.to_pairs().is_empty()
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(category) = self
            .category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES)
        {
            pairs.push(("category", category.to_string()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("price__gte", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("price__lte", max.to_string()));
        }
        if let Some(ordering) = self.sort.as_ordering() {
            pairs.push(("ordering", ordering.to_string()));
        }
        if let Some(email) = &self.customer_email {
            pairs.push(("customer_email", email.to_string()));
        }
        pairs
    }
}

/// Parameters for `GET /api/products/search/`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub q: String,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub category: Option<String>,
    /// Only products with at least one review of this many stars or more.
    pub min_rating: Option<u8>,
}

impl SearchQuery {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("q", self.q.trim().to_string())];
        if let Some(min) = self.min_price {
            pairs.push(("min_price", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("max_price", max.to_string()));
        }
        if let Some(category) = self
            .category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES)
        {
            pairs.push(("category", category.to_string()));
        }
        if let Some(rating) = self.min_rating {
            pairs.push(("rating", rating.to_string()));
        }
        pairs
    }
}

// =============================================================================
// Cache
// =============================================================================

/// Cache key for catalog listings.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CatalogCacheKey {
    Products,
    CateringServices,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CatalogCacheValue {
    Products(Vec<Product>),
    CateringServices(Vec<CateringService>),
}

// =============================================================================
// Endpoints
// =============================================================================

impl ApiClient {
    /// List menu items.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let cacheable = query.is_unfiltered();

        if cacheable
            && let Some(CatalogCacheValue::Products(mut products)) =
                self.cache().get(&CatalogCacheKey::Products).await
        {
            debug!("Cache hit for products");
            sort_products(&mut products, query.sort);
            return Ok(products);
        }

        let mut products = self
            .get_json::<Listing<Product>>("api/products/", &query.to_pairs())
            .await?
            .into_vec();

        if cacheable {
            self.cache()
                .insert(
                    CatalogCacheKey::Products,
                    CatalogCacheValue::Products(products.clone()),
                )
                .await;
        }

        // Orders the backend cannot apply; a no-op for the others.
        if query.sort.as_ordering().is_none() {
            sort_products(&mut products, query.sort);
        }

        debug!(count = products.len(), "Fetched products");
        Ok(products)
    }

    /// Get a single menu item.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.get_json(&format!("api/products/{id}/"), &[]).await
    }

    /// Full-text search with price, category, and rating filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(q = %query.q))]
    pub async fn search_products(&self, query: &SearchQuery) -> Result<Vec<Product>, ApiError> {
        Ok(self
            .get_json::<Listing<Product>>("api/products/search/", &query.to_pairs())
            .await?
            .into_vec())
    }

    /// Products in one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products_by_category(&self, category: &str) -> Result<Vec<Product>, ApiError> {
        Ok(self
            .get_json::<Listing<Product>>(
                "api/products/by_category/",
                &[("category", category.to_string())],
            )
            .await?
            .into_vec())
    }

    /// "You may also like" items for a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product_recommendations(&self, id: ProductId) -> Result<Vec<Product>, ApiError> {
        Ok(self
            .get_json::<Listing<Product>>(&format!("api/products/{id}/recommendations/"), &[])
            .await?
            .into_vec())
    }

    /// Active catering packages, in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn catering_services(&self) -> Result<Vec<CateringService>, ApiError> {
        if let Some(CatalogCacheValue::CateringServices(services)) =
            self.cache().get(&CatalogCacheKey::CateringServices).await
        {
            debug!("Cache hit for catering services");
            return Ok(services);
        }

        let mut services: Vec<CateringService> = self
            .get_json::<Listing<CateringService>>("api/catering-services/", &[])
            .await?
            .into_vec()
            .into_iter()
            .filter(|s| s.is_active)
            .collect();
        services.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));

        self.cache()
            .insert(
                CatalogCacheKey::CateringServices,
                CatalogCacheValue::CateringServices(services.clone()),
            )
            .await;

        Ok(services)
    }

    /// Restaurant contact details.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn site_settings(&self) -> Result<SiteSettings, ApiError> {
        self.get_json("api/settings/", &[]).await
    }
}

// =============================================================================
// Client-side browsing
// =============================================================================

/// Keep products in `category`; `"all"` keeps everything.
#[must_use]
pub fn filter_by_category<'a>(products: &'a [Product], category: &str) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|p| category == ALL_CATEGORIES || p.category == category)
        .collect()
}

/// Keep products priced within `[min, max]`; either bound may be open.
#[must_use]
pub fn filter_by_price<'a>(
    products: &'a [Product],
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|p| min.is_none_or(|min| p.price >= min))
        .filter(|p| max.is_none_or(|max| p.price <= max))
        .collect()
}

/// Sort in place. Ties keep their existing relative order.
pub fn sort_products<P: Borrow<Product>>(products: &mut [P], sort: ProductSort) {
    match sort {
        ProductSort::Featured => {}
        ProductSort::PriceLowToHigh => {
            products.sort_by(|a, b| a.borrow().price.cmp(&b.borrow().price));
        }
        ProductSort::PriceHighToLow => {
            products.sort_by(|a, b| b.borrow().price.cmp(&a.borrow().price));
        }
        ProductSort::Name => products.sort_by_key(|p| p.borrow().name.to_lowercase()),
        ProductSort::Newest => {
            products.sort_by(|a, b| b.borrow().created_at.cmp(&a.borrow().created_at));
        }
        ProductSort::Rating => products.sort_by(|a, b| {
            let (a, b) = (a.borrow(), b.borrow());
            b.average_rating
                .total_cmp(&a.average_rating)
                .then_with(|| b.review_count.cmp(&a.review_count))
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i64, name: &str, price: i64, category: &str, rating: f64) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: String::new(),
            price: Decimal::from(price),
            category: category.to_string(),
            image: None,
            is_available: true,
            created_at: None,
            average_rating: rating,
            review_count: 0,
            rating_distribution: BTreeMap::new(),
            reviews: Vec::new(),
            is_in_wishlist: false,
        }
    }

    fn menu() -> Vec<Product> {
        vec![
            product(1, "Puff Puff", 1500, "finger-foods", 4.5),
            product(2, "Zobo", 800, "beverages", 3.0),
            product(3, "chin chin", 1200, "finger-foods", 4.9),
            product(4, "Cake Slice", 2500, "desserts", 0.0),
        ]
    }

    #[test]
    fn test_decodes_backend_product() {
        let json = r#"{
            "id": 7, "name": "Small Chops Platter", "description": "Samosa, spring rolls",
            "price": "8500.00", "category": "finger-foods", "image": null,
            "is_available": true, "created_at": "2025-03-01T10:00:00Z",
            "updated_at": "2025-03-02T10:00:00Z",
            "average_rating": 4.5, "review_count": 2,
            "rating_distribution": {"5": 1, "4": 1, "3": 0, "2": 0, "1": 0},
            "reviews": [{"id": 1, "customer_name": "Ada", "rating": 5, "comment": "Lovely",
                         "is_verified_purchase": false, "created_at": "2025-03-03T10:00:00Z"}],
            "is_in_wishlist": false
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(7));
        assert_eq!(product.price, Decimal::new(850_000, 2));
        assert_eq!(product.rating_distribution.get(&5), Some(&1));
        assert_eq!(product.reviews.len(), 1);
        assert_eq!(
            product.price_in(CurrencyCode::NGN).display(),
            "₦8,500.00"
        );
    }

    #[test]
    fn test_filter_by_category() {
        let menu = menu();
        assert_eq!(filter_by_category(&menu, ALL_CATEGORIES).len(), 4);
        let snacks: Vec<_> = filter_by_category(&menu, "finger-foods")
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(snacks, vec![ProductId::new(1), ProductId::new(3)]);
        assert!(filter_by_category(&menu, "soups").is_empty());
    }

    #[test]
    fn test_filter_by_price_bounds_are_inclusive() {
        let menu = menu();
        let mid = filter_by_price(&menu, Some(Decimal::from(1200)), Some(Decimal::from(1500)));
        assert_eq!(mid.len(), 2);
        assert_eq!(filter_by_price(&menu, None, Some(Decimal::from(800))).len(), 1);
        assert_eq!(filter_by_price(&menu, None, None).len(), 4);
    }

    #[test]
    fn test_sort_products() {
        let menu = menu();
        let mut view: Vec<&Product> = menu.iter().collect();

        sort_products(&mut view, ProductSort::PriceLowToHigh);
        assert_eq!(view.first().unwrap().name, "Zobo");

        sort_products(&mut view, ProductSort::PriceHighToLow);
        assert_eq!(view.first().unwrap().name, "Cake Slice");

        sort_products(&mut view, ProductSort::Name);
        let names: Vec<_> = view.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Cake Slice", "chin chin", "Puff Puff", "Zobo"]);

        sort_products(&mut view, ProductSort::Rating);
        assert_eq!(view.first().unwrap().name, "chin chin");
    }

    #[test]
    fn test_query_pairs() {
        assert!(ProductQuery::default().is_unfiltered());

        let all = ProductQuery {
            category: Some(ALL_CATEGORIES.to_string()),
            search: Some("  ".to_string()),
            ..ProductQuery::default()
        };
        assert!(all.is_unfiltered());

        let query = ProductQuery {
            category: Some("desserts".to_string()),
            max_price: Some(Decimal::from(3000)),
            sort: ProductSort::PriceHighToLow,
            customer_email: Some(Email::parse("ada@example.com").unwrap()),
            ..ProductQuery::default()
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("category", "desserts".to_string()),
                ("price__lte", "3000".to_string()),
                ("ordering", "-price".to_string()),
                ("customer_email", "ada@example.com".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_pairs() {
        let query = SearchQuery {
            q: " jollof ".to_string(),
            min_rating: Some(4),
            ..SearchQuery::default()
        };
        assert_eq!(
            query.to_pairs(),
            vec![("q", "jollof".to_string()), ("rating", "4".to_string())]
        );
    }

    #[test]
    fn test_social_links_skip_blank() {
        let settings = SiteSettings {
            instagram: "https://instagram.com/chophouse".to_string(),
            ..SiteSettings::default()
        };
        assert_eq!(
            settings.social_links(),
            vec![("instagram", "https://instagram.com/chophouse")]
        );
    }
}
