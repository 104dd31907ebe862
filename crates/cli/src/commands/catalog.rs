//! Menu browsing commands.

use chophouse_core::{Email, ProductId};
use chophouse_storefront::ApiClient;
use chophouse_storefront::api::catalog::{Product, ProductQuery, ProductSort, SearchQuery};
use rust_decimal::Decimal;

use super::{CliError, output};

/// Filters accepted by `chop products`.
pub struct ProductFilters {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: ProductSort,
    pub email: Option<String>,
}

fn print_products(api: &ApiClient, products: &[Product]) {
    if products.is_empty() {
        output::line("No products found.");
        return;
    }
    for product in products {
        let mut row = format!(
            "#{:<4} {:<32} {:>12}  {:<14} {:.1}★ ({})",
            product.id,
            product.name,
            product.price_in(api.currency()).display(),
            product.category,
            product.average_rating,
            product.review_count,
        );
        if !product.is_available {
            row.push_str("  [unavailable]");
        }
        if product.is_in_wishlist {
            row.push_str("  ♥");
        }
        output::line(&row);
    }
}

/// List menu items.
///
/// # Errors
///
/// Returns an error if the email is malformed or the request fails.
pub async fn products(api: &ApiClient, filters: ProductFilters) -> Result<(), CliError> {
    let query = ProductQuery {
        search: filters.search,
        category: filters.category,
        min_price: filters.min_price,
        max_price: filters.max_price,
        sort: filters.sort,
        customer_email: filters.email.as_deref().map(Email::parse).transpose()?,
    };
    let products = api.list_products(&query).await?;
    print_products(api, &products);
    Ok(())
}

/// Show one product, including its reviews.
///
/// # Errors
///
/// Returns an error if the product does not exist or the request fails.
pub async fn product(api: &ApiClient, id: ProductId) -> Result<(), CliError> {
    output::json(&api.get_product(id).await?)
}

/// Search the menu.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn search(api: &ApiClient, query: SearchQuery) -> Result<(), CliError> {
    let products = api.search_products(&query).await?;
    print_products(api, &products);
    Ok(())
}

/// Items similar to a product.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn recommendations(api: &ApiClient, id: ProductId) -> Result<(), CliError> {
    let products = api.product_recommendations(id).await?;
    print_products(api, &products);
    Ok(())
}

/// List active catering services.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn catering(api: &ApiClient) -> Result<(), CliError> {
    for service in api.catering_services().await? {
        output::line(&format!("{} - {}", service.name, service.short_description));
        for feature in &service.features {
            output::line(&format!("  • {feature}"));
        }
        if !service.pricing_info.is_empty() {
            output::line(&format!("  {}", service.pricing_info));
        }
    }
    Ok(())
}

/// Restaurant contact details.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn settings(api: &ApiClient) -> Result<(), CliError> {
    let settings = api.site_settings().await?;
    for (label, value) in [
        ("Phone", &settings.phone),
        ("Email", &settings.email),
        ("Address", &settings.address),
        ("Hours", &settings.hours),
    ] {
        if !value.is_empty() {
            output::line(&format!("{label}: {value}"));
        }
    }
    for (network, url) in settings.social_links() {
        output::line(&format!("{network}: {url}"));
    }
    Ok(())
}
