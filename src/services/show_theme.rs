//! Show theme service

use crate::cache::{keys, CacheLayer, MemoryCache};
use crate::db::is_unique_violation;
use crate::db::repositories::ShowThemeRepository;
use crate::models::ShowTheme;
use anyhow::Context;
use std::sync::Arc;

/// Theme names are stored trimmed and limited to this many characters
pub const MAX_THEME_NAME_LENGTH: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ShowThemeServiceError {
    #[error("Show theme not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Show theme already exists: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Theme catalogue with a cached full listing
pub struct ShowThemeService {
    repo: Arc<dyn ShowThemeRepository>,
    cache: Arc<MemoryCache>,
}

impl ShowThemeService {
    pub fn new(repo: Arc<dyn ShowThemeRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, cache }
    }

    /// Create a theme.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the name is blank or too long
    /// - `Conflict` if a theme with the same name exists
    pub async fn create(&self, name: &str) -> Result<ShowTheme, ShowThemeServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ShowThemeServiceError::ValidationError(
                "Theme name cannot be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_THEME_NAME_LENGTH {
            return Err(ShowThemeServiceError::ValidationError(format!(
                "Theme name cannot exceed {} characters",
                MAX_THEME_NAME_LENGTH
            )));
        }

        if self
            .repo
            .get_by_name(name)
            .await
            .context("Failed to check theme name")?
            .is_some()
        {
            return Err(ShowThemeServiceError::Conflict(format!(
                "Theme '{}' already exists",
                name
            )));
        }

        let theme = match self.repo.create(&ShowTheme::new(name.to_string())).await {
            Ok(theme) => theme,
            Err(e) if is_unique_violation(&e) => {
                return Err(ShowThemeServiceError::Conflict(format!(
                    "Theme '{}' already exists",
                    name
                )))
            }
            Err(e) => return Err(e.context("Failed to create theme").into()),
        };

        let _ = self.cache.delete(keys::SHOW_THEMES).await;
        tracing::info!(theme_id = theme.id, name = %theme.name, "Show theme created");

        Ok(theme)
    }

    /// All themes in ID order
    pub async fn list(&self) -> Result<Vec<ShowTheme>, ShowThemeServiceError> {
        if let Some(themes) = self.cache.get::<Vec<ShowTheme>>(keys::SHOW_THEMES).await.ok().flatten() {
            return Ok(themes);
        }

        tracing::debug!("Theme list cache miss");
        let themes = self.repo.list().await.context("Failed to list themes")?;
        let _ = self
            .cache
            .set(keys::SHOW_THEMES, &themes, self.cache.default_ttl())
            .await;

        Ok(themes)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<ShowTheme, ShowThemeServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get theme")?
            .ok_or_else(|| ShowThemeServiceError::NotFound(format!("Theme {} does not exist", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxShowThemeRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> ShowThemeService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        ShowThemeService::new(
            SqlxShowThemeRepository::boxed(pool),
            Arc::new(MemoryCache::new()),
        )
    }

    #[tokio::test]
    async fn test_create_trims_name() {
        let service = setup_test_service().await;

        let theme = service.create("  Black holes ").await.unwrap();
        assert_eq!(theme.name, "Black holes");
        assert_eq!(service.get_by_id(theme.id).await.unwrap(), theme);
    }

    #[tokio::test]
    async fn test_name_length_limit() {
        let service = setup_test_service().await;

        let longest = "é".repeat(MAX_THEME_NAME_LENGTH);
        assert_eq!(service.create(&longest).await.unwrap().name, longest);

        let err = service.create(&"x".repeat(MAX_THEME_NAME_LENGTH + 1)).await.unwrap_err();
        assert!(matches!(err, ShowThemeServiceError::ValidationError(msg) if msg.contains("100")));
    }

    #[tokio::test]
    async fn test_create_validation_and_conflict() {
        let service = setup_test_service().await;

        assert!(matches!(
            service.create("   ").await,
            Err(ShowThemeServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(&"x".repeat(MAX_THEME_NAME_LENGTH + 1)).await,
            Err(ShowThemeServiceError::ValidationError(_))
        ));

        service.create("Stars").await.unwrap();
        assert!(matches!(
            service.create("Stars").await,
            Err(ShowThemeServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_list_cache_is_invalidated_on_create() {
        let service = setup_test_service().await;
        service.create("Stars").await.unwrap();

        // Warm the cache, then add another theme
        assert_eq!(service.list().await.unwrap().len(), 1);
        service.create("Planets").await.unwrap();

        let names: Vec<String> = service.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Stars", "Planets"]);
    }

    #[tokio::test]
    async fn test_get_unknown_theme() {
        let service = setup_test_service().await;
        assert!(matches!(
            service.get_by_id(7).await,
            Err(ShowThemeServiceError::NotFound(_))
        ));
    }
}
