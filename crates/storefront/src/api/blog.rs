//! Blog posts.

use chophouse_core::BlogPostId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{ApiClient, ApiError, Listing};

/// A published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: BlogPostId,
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub author: String,
    /// `recipes`, `tips`, or `updates`.
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl BlogPost {
    /// First `max_chars` characters of the content, cut at a word boundary.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> String {
        let content = self.content.trim();
        if content.chars().count() <= max_chars {
            return content.to_string();
        }
        let cut: String = content.chars().take(max_chars).collect();
        let trimmed = cut.rsplit_once(char::is_whitespace).map_or(cut.as_str(), |(head, _)| head);
        format!("{}...", trimmed.trim_end())
    }
}

impl ApiClient {
    /// All posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn blog_posts(&self) -> Result<Vec<BlogPost>, ApiError> {
        Ok(self
            .get_json::<Listing<BlogPost>>("api/blog/", &[])
            .await?
            .into_vec())
    }

    /// A single post by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the post does not exist or the request fails.
    #[instrument(skip(self))]
    pub async fn blog_post(&self, slug: &str) -> Result<BlogPost, ApiError> {
        self.get_json(&format!("api/blog/{slug}/"), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(content: &str) -> BlogPost {
        BlogPost {
            id: BlogPostId::new(1),
            title: "Perfect Puff Puff".to_string(),
            slug: "perfect-puff-puff".to_string(),
            content: content.to_string(),
            image: None,
            author: "Chef Tunde".to_string(),
            category: "recipes".to_string(),
            created_at: None,
        }
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(post("Short post").excerpt(50), "Short post");
        assert_eq!(
            post("Proof the dough for an hour before frying").excerpt(20),
            "Proof the dough for..."
        );
    }
}
