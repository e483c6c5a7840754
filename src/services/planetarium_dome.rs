//! Planetarium dome service

use crate::db::is_unique_violation;
use crate::db::repositories::PlanetariumDomeRepository;
use crate::models::{CreatePlanetariumDomeInput, PlanetariumDome};
use anyhow::Context;
use std::sync::Arc;

/// Upper bound on either dimension of a dome's seating grid
pub const MAX_DOME_DIMENSION: i32 = 1000;

/// Width of the `planetarium_domes.name` column
pub const MAX_DOME_NAME_LENGTH: usize = 255;

#[derive(Debug, thiserror::Error)]
pub enum PlanetariumDomeServiceError {
    #[error("Planetarium dome not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Planetarium dome already exists: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PlanetariumDomeService {
    repo: Arc<dyn PlanetariumDomeRepository>,
}

impl PlanetariumDomeService {
    pub fn new(repo: Arc<dyn PlanetariumDomeRepository>) -> Self {
        Self { repo }
    }

    /// Create a dome with a unique name and a non-empty seating grid
    pub async fn create(&self, input: CreatePlanetariumDomeInput) -> Result<PlanetariumDome, PlanetariumDomeServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(PlanetariumDomeServiceError::ValidationError(
                "Dome name cannot be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_DOME_NAME_LENGTH {
            return Err(PlanetariumDomeServiceError::ValidationError(format!(
                "Dome name cannot exceed {} characters",
                MAX_DOME_NAME_LENGTH
            )));
        }
        for (field, value) in [("rows", input.rows), ("seats_in_row", input.seats_in_row)] {
            if !(1..=MAX_DOME_DIMENSION).contains(&value) {
                return Err(PlanetariumDomeServiceError::ValidationError(format!(
                    "{} must be between 1 and {}",
                    field, MAX_DOME_DIMENSION
                )));
            }
        }

        let conflict = || PlanetariumDomeServiceError::Conflict(format!("Dome '{}' already exists", name));

        if self
            .repo
            .get_by_name(name)
            .await
            .context("Failed to check dome name")?
            .is_some()
        {
            return Err(conflict());
        }

        let dome = PlanetariumDome::new(name.to_string(), input.rows, input.seats_in_row);
        let created = match self.repo.create(&dome).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(conflict()),
            Err(e) => return Err(e.context("Failed to create dome").into()),
        };

        tracing::info!(dome_id = created.id, capacity = created.capacity(), "Planetarium dome created");
        Ok(created)
    }

    pub async fn list(&self) -> Result<Vec<PlanetariumDome>, PlanetariumDomeServiceError> {
        let domes = self.repo.list().await.context("Failed to list domes")?;
        Ok(domes)
    }

    pub async fn get(&self, id: i64) -> Result<PlanetariumDome, PlanetariumDomeServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get dome")?
            .ok_or_else(|| PlanetariumDomeServiceError::NotFound(format!("Dome {} does not exist", id)))
    }
}
