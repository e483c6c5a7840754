//! Astronomy show service
//!
//! Validates show payloads against the theme catalogue and keeps the show
//! detail cache coherent with the theme links.

use crate::cache::{keys, CacheLayer, MemoryCache};
use crate::db::repositories::{AstronomyShowRepository, ShowThemeRepository};
use crate::models::{AstronomyShow, AstronomyShowFilter, CreateAstronomyShowInput};
use anyhow::Context;
use std::collections::BTreeSet;
use std::sync::Arc;

pub const MAX_TITLE_LENGTH: usize = 255;

#[derive(Debug, thiserror::Error)]
pub enum AstronomyShowServiceError {
    #[error("Astronomy show not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct AstronomyShowService {
    repo: Arc<dyn AstronomyShowRepository>,
    theme_repo: Arc<dyn ShowThemeRepository>,
    cache: Arc<MemoryCache>,
}

impl AstronomyShowService {
    pub fn new(
        repo: Arc<dyn AstronomyShowRepository>,
        theme_repo: Arc<dyn ShowThemeRepository>,
        cache: Arc<MemoryCache>,
    ) -> Self {
        Self {
            repo,
            theme_repo,
            cache,
        }
    }

    /// Create a show and link its themes in one transaction.
    ///
    /// The title is trimmed and required. Duplicate theme IDs collapse to a
    /// single link; an ID that names no theme is a validation error.
    pub async fn create(&self, input: CreateAstronomyShowInput) -> Result<AstronomyShow, AstronomyShowServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AstronomyShowServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(AstronomyShowServiceError::ValidationError(format!(
                "Title cannot exceed {} characters",
                MAX_TITLE_LENGTH
            )));
        }

        let theme_ids: Vec<i64> = input.show_themes.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        self.ensure_themes_exist(&theme_ids).await?;

        let show = AstronomyShow::new(title.to_string(), input.description);
        let created = self
            .repo
            .create(&show, &theme_ids)
            .await
            .context("Failed to create astronomy show")?;

        tracing::info!(
            show_id = created.id,
            themes = created.show_themes.len(),
            "Astronomy show created"
        );
        Ok(created)
    }

    /// Show detail by ID, served from cache when possible
    pub async fn get(&self, id: i64) -> Result<AstronomyShow, AstronomyShowServiceError> {
        let cache_key = keys::astronomy_show(id);
        if let Some(show) = self.cache.get::<AstronomyShow>(&cache_key).await.ok().flatten() {
            return Ok(show);
        }

        tracing::debug!(show_id = id, "Astronomy show cache miss");
        let show = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get astronomy show")?
            .ok_or_else(|| AstronomyShowServiceError::NotFound(format!("Astronomy show {} does not exist", id)))?;

        let _ = self.cache.set(&cache_key, &show, self.cache.default_ttl()).await;
        Ok(show)
    }

    /// Shows matching `filter`, in ID order
    pub async fn list(&self, filter: &AstronomyShowFilter) -> Result<Vec<AstronomyShow>, AstronomyShowServiceError> {
        let shows = self
            .repo
            .list(filter)
            .await
            .context("Failed to list astronomy shows")?;
        Ok(shows)
    }

    /// Attach an existing theme to a show and return the updated show
    pub async fn add_theme(&self, show_id: i64, theme_id: i64) -> Result<AstronomyShow, AstronomyShowServiceError> {
        if self
            .repo
            .get_by_id(show_id)
            .await
            .context("Failed to get astronomy show")?
            .is_none()
        {
            return Err(AstronomyShowServiceError::NotFound(format!(
                "Astronomy show {} does not exist",
                show_id
            )));
        }
        self.ensure_themes_exist(&[theme_id]).await?;

        self.repo
            .add_theme(show_id, theme_id)
            .await
            .context("Failed to link theme")?;
        let _ = self.cache.delete(&keys::astronomy_show(show_id)).await;

        tracing::info!(show_id, theme_id, "Theme added to astronomy show");
        self.get(show_id).await
    }

    /// Fail with the sorted list of IDs that name no theme
    async fn ensure_themes_exist(&self, ids: &[i64]) -> Result<(), AstronomyShowServiceError> {
        if ids.is_empty() {
            return Ok(());
        }

        let found: BTreeSet<i64> = self
            .theme_repo
            .get_by_ids(ids)
            .await
            .context("Failed to load themes")?
            .into_iter()
            .map(|t| t.id)
            .collect();

        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains(*id))
            .map(|id| id.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AstronomyShowServiceError::ValidationError(format!(
                "Unknown show theme ids: {}",
                missing.join(", ")
            )))
        }
    }
}
