//! Blog, feedback, wishlist, newsletter, and contact commands.

use chophouse_core::{Email, ProductId};
use chophouse_storefront::ApiClient;
use chophouse_storefront::api::contact::ContactMessage;
use chophouse_storefront::api::reviews::NewReview;

use super::{CliError, output};

/// List blog posts, or print one in full.
///
/// # Errors
///
/// Returns an error if the post does not exist or the request fails.
pub async fn blog(api: &ApiClient, slug: Option<&str>) -> Result<(), CliError> {
    if let Some(slug) = slug {
        let post = api.blog_post(slug).await?;
        output::line(&format!("{}\nby {}\n\n{}", post.title, post.author, post.content));
        return Ok(());
    }

    for post in api.blog_posts().await? {
        output::line(&format!("[{}] {} ({})", post.category, post.title, post.slug));
        output::line(&format!("    {}", post.excerpt(120)));
    }
    Ok(())
}

/// Reviews, ratings, and comments for a product.
///
/// # Errors
///
/// Returns an error if any request fails.
pub async fn reviews(api: &ApiClient, product: ProductId) -> Result<(), CliError> {
    let (reviews, ratings, comments) = tokio::try_join!(
        api.reviews_for_product(product),
        api.ratings_for_product(product),
        api.comments_for_product(product),
    )?;

    output::line(&format!("Reviews ({})", reviews.len()));
    for review in &reviews {
        let verified = if review.is_verified_purchase { " ✓" } else { "" };
        output::line(&format!(
            "  {}★ {}{}: {}",
            review.rating, review.customer_name, verified, review.comment
        ));
    }
    output::line(&format!("Ratings ({})", ratings.len()));
    output::line(&format!("Comments ({})", comments.len()));
    for comment in &comments {
        output::line(&format!("  {}", comment.comment));
    }
    Ok(())
}

/// Submit a review.
///
/// # Errors
///
/// Returns an error if the input is invalid, the customer already reviewed
/// this product, or the request fails.
pub async fn submit_review(
    api: &ApiClient,
    product: ProductId,
    name: &str,
    email: &str,
    rating: u8,
    comment: &str,
) -> Result<(), CliError> {
    let review = NewReview::new(product, name, email, rating, comment)?;
    output::line(&api.submit_review(&review).await?);
    Ok(())
}

/// Rate a product.
///
/// # Errors
///
/// Returns an error if the input is invalid, the customer already rated this
/// product, or the request fails.
pub async fn rate(api: &ApiClient, product: ProductId, email: &str, rating: u8) -> Result<(), CliError> {
    api.rate_product(product, &Email::parse(email)?, rating).await?;
    output::line("Thanks for rating!");
    Ok(())
}

/// Comment on a product.
///
/// # Errors
///
/// Returns an error if the input is invalid, the customer already commented,
/// or the request fails.
pub async fn comment(
    api: &ApiClient,
    product: ProductId,
    email: &str,
    comment: &str,
) -> Result<(), CliError> {
    api.comment_on_product(product, &Email::parse(email)?, comment)
        .await?;
    output::line("Comment posted.");
    Ok(())
}

/// List a customer's saved products.
///
/// # Errors
///
/// Returns an error if the email is malformed or the request fails.
pub async fn wishlist(api: &ApiClient, email: &str) -> Result<(), CliError> {
    let items = api.wishlist(&Email::parse(email)?).await?;
    if items.is_empty() {
        output::line("Wishlist is empty.");
    }
    for item in items {
        output::line(&format!(
            "#{:<4} {:<32} {}",
            item.product.id,
            item.product.name,
            item.product.price_in(api.currency())
        ));
    }
    Ok(())
}

/// Save a product.
///
/// # Errors
///
/// Returns an error if the email is malformed or the request fails.
pub async fn wishlist_add(api: &ApiClient, email: &str, product: ProductId) -> Result<(), CliError> {
    api.add_to_wishlist(&Email::parse(email)?, product).await?;
    output::line("Added to wishlist.");
    Ok(())
}

/// Remove a saved product.
///
/// # Errors
///
/// Returns an error if the email is malformed or the request fails.
pub async fn wishlist_remove(
    api: &ApiClient,
    email: &str,
    product: ProductId,
) -> Result<(), CliError> {
    let removed = api.remove_from_wishlist(&Email::parse(email)?, product).await?;
    output::line(if removed {
        "Removed from wishlist."
    } else {
        "That product was not in the wishlist."
    });
    Ok(())
}

/// Subscribe to the newsletter.
///
/// # Errors
///
/// Returns an error if the email is malformed or the request fails.
pub async fn subscribe(
    api: &ApiClient,
    email: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<(), CliError> {
    let subscription = api
        .subscribe_newsletter(&Email::parse(email)?, first_name, last_name)
        .await?;
    output::line(&subscription.message);
    Ok(())
}

/// Unsubscribe from the newsletter.
///
/// # Errors
///
/// Returns an error if the email is not subscribed or the request fails.
pub async fn unsubscribe(api: &ApiClient, email: &str) -> Result<(), CliError> {
    output::line(&api.unsubscribe_newsletter(&Email::parse(email)?).await?);
    Ok(())
}

/// Send a contact message.
///
/// # Errors
///
/// Returns an error if the input is invalid or the request fails.
pub async fn contact(
    api: &ApiClient,
    first_name: &str,
    last_name: &str,
    email: &str,
    phone: Option<&str>,
    message: &str,
) -> Result<(), CliError> {
    let message = ContactMessage::new(first_name, last_name, email, phone, message)?;
    output::line(&api.send_contact_message(&message).await?);
    Ok(())
}
