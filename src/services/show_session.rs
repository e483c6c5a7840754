//! Show session service
//!
//! Schedules astronomy shows into domes. Show times are kept to whole
//! seconds so that stored and echoed values compare equal on every backend.

use crate::db::repositories::{AstronomyShowRepository, PlanetariumDomeRepository, ShowSessionRepository};
use crate::models::{PlanetariumDome, ShowSessionDetail, ShowSessionFilter, ShowSessionInput, ShowSessionSummary};
use anyhow::Context;
use chrono::SubsecRound;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ShowSessionServiceError {
    #[error("Show session not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The change would orphan tickets already sold
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ShowSessionService {
    repo: Arc<dyn ShowSessionRepository>,
    show_repo: Arc<dyn AstronomyShowRepository>,
    dome_repo: Arc<dyn PlanetariumDomeRepository>,
}

impl ShowSessionService {
    pub fn new(
        repo: Arc<dyn ShowSessionRepository>,
        show_repo: Arc<dyn AstronomyShowRepository>,
        dome_repo: Arc<dyn PlanetariumDomeRepository>,
    ) -> Self {
        Self {
            repo,
            show_repo,
            dome_repo,
        }
    }

    /// Schedule a session; the show and dome must exist
    pub async fn create(&self, input: ShowSessionInput) -> Result<ShowSessionSummary, ShowSessionServiceError> {
        let input = self.validate(input).await?.0;

        let session = self
            .repo
            .create(&input)
            .await
            .context("Failed to create show session")?;
        tracing::info!(
            session_id = session.id,
            show_id = session.astronomy_show_id,
            dome_id = session.planetarium_dome_id,
            "Show session created"
        );

        self.get_summary(session.id).await
    }

    /// Replace a session's show, dome and time.
    ///
    /// Moving a session to a smaller dome is refused while sold seats would
    /// fall outside it.
    pub async fn update(&self, id: i64, input: ShowSessionInput) -> Result<ShowSessionSummary, ShowSessionServiceError> {
        if self.repo.get_by_id(id).await.context("Failed to get show session")?.is_none() {
            return Err(not_found(id));
        }
        let (input, dome) = self.validate(input).await?;

        let taken = self
            .repo
            .taken_places(id)
            .await
            .context("Failed to load taken places")?;
        if let Some(place) = taken.iter().find(|p| !dome.contains_seat(p.row, p.seat)) {
            return Err(ShowSessionServiceError::Conflict(format!(
                "Sold seat row {} seat {} does not exist in dome '{}'",
                place.row, place.seat, dome.name
            )));
        }

        if !self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update show session")?
        {
            return Err(not_found(id));
        }
        tracing::info!(session_id = id, "Show session updated");

        self.get_summary(id).await
    }

    /// Delete a session together with its tickets
    pub async fn delete(&self, id: i64) -> Result<(), ShowSessionServiceError> {
        let deleted = self
            .repo
            .delete(id)
            .await
            .context("Failed to delete show session")?;
        if !deleted {
            return Err(not_found(id));
        }

        tracing::info!(session_id = id, "Show session deleted");
        Ok(())
    }

    pub async fn list(&self, filter: &ShowSessionFilter) -> Result<Vec<ShowSessionSummary>, ShowSessionServiceError> {
        let sessions = self
            .repo
            .list(filter)
            .await
            .context("Failed to list show sessions")?;
        Ok(sessions)
    }

    pub async fn get_summary(&self, id: i64) -> Result<ShowSessionSummary, ShowSessionServiceError> {
        self.repo
            .get_summary(id)
            .await
            .context("Failed to get show session")?
            .ok_or_else(|| not_found(id))
    }

    /// Session with its show, dome and sold seats
    pub async fn get_detail(&self, id: i64) -> Result<ShowSessionDetail, ShowSessionServiceError> {
        let session = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get show session")?
            .ok_or_else(|| not_found(id))?;

        let astronomy_show = self
            .show_repo
            .get_by_id(session.astronomy_show_id)
            .await
            .context("Failed to get astronomy show")?
            .context("Show session references a missing astronomy show")?;
        let planetarium_dome = self
            .dome_repo
            .get_by_id(session.planetarium_dome_id)
            .await
            .context("Failed to get planetarium dome")?
            .context("Show session references a missing dome")?;
        let taken_places = self
            .repo
            .taken_places(id)
            .await
            .context("Failed to load taken places")?;

        Ok(ShowSessionDetail {
            id: session.id,
            show_time: session.show_time,
            astronomy_show,
            planetarium_dome,
            taken_places,
        })
    }

    /// Check the referenced show and dome, returning the normalized input
    /// and the dome
    async fn validate(
        &self,
        input: ShowSessionInput,
    ) -> Result<(ShowSessionInput, PlanetariumDome), ShowSessionServiceError> {
        if self
            .show_repo
            .get_by_id(input.astronomy_show_id)
            .await
            .context("Failed to get astronomy show")?
            .is_none()
        {
            return Err(ShowSessionServiceError::ValidationError(format!(
                "Astronomy show {} does not exist",
                input.astronomy_show_id
            )));
        }

        let dome = self
            .dome_repo
            .get_by_id(input.planetarium_dome_id)
            .await
            .context("Failed to get planetarium dome")?
            .ok_or_else(|| {
                ShowSessionServiceError::ValidationError(format!(
                    "Planetarium dome {} does not exist",
                    input.planetarium_dome_id
                ))
            })?;

        let input = ShowSessionInput {
            show_time: input.show_time.trunc_subsecs(0),
            ..input
        };
        Ok((input, dome))
    }
}

fn not_found(id: i64) -> ShowSessionServiceError {
    ShowSessionServiceError::NotFound(format!("Show session {} does not exist", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ReservationRepository, SqlxAstronomyShowRepository, SqlxPlanetariumDomeRepository,
        SqlxReservationRepository, SqlxShowSessionRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{AstronomyShow, CreateReservationInput, TicketInput, User, UserRole};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    struct Fixture {
        pool: DynDatabasePool,
        service: ShowSessionService,
        show_id: i64,
        dome: PlanetariumDome,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let shows = SqlxAstronomyShowRepository::boxed(pool.clone());
        let domes = SqlxPlanetariumDomeRepository::boxed(pool.clone());
        let show = shows
            .create(&AstronomyShow::new("Orion".to_string(), String::new()), &[])
            .await
            .unwrap();
        let dome = domes
            .create(&PlanetariumDome::new("Blue".to_string(), 3, 4))
            .await
            .unwrap();

        let service = ShowSessionService::new(SqlxShowSessionRepository::boxed(pool.clone()), shows, domes);
        Fixture {
            pool,
            service,
            show_id: show.id,
            dome,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, 0, 0).unwrap()
    }

    fn input(f: &Fixture, show_time: DateTime<Utc>) -> ShowSessionInput {
        ShowSessionInput {
            astronomy_show_id: f.show_id,
            planetarium_dome_id: f.dome.id,
            show_time,
        }
    }

    async fn sell_seat(f: &Fixture, session_id: i64, row: i32, seat: i32) {
        let users = SqlxUserRepository::new(f.pool.clone());
        let user = match users.get_by_email("buyer@planetarium.test").await.unwrap() {
            Some(user) => user,
            None => users
                .create(&User::new("buyer@planetarium.test".to_string(), "hash".to_string(), UserRole::Visitor))
                .await
                .unwrap(),
        };
        SqlxReservationRepository::new(f.pool.clone())
            .create(&CreateReservationInput {
                user_id: user.id,
                tickets: vec![TicketInput {
                    row,
                    seat,
                    show_session_id: session_id,
                }],
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_truncates_subseconds() {
        let f = setup().await;
        let precise = at(18) + chrono::Duration::milliseconds(750);

        let summary = f.service.create(input(&f, precise)).await.unwrap();

        assert_eq!(summary.show_time, at(18));
        assert_eq!(summary.astronomy_show_title, "Orion");
        assert_eq!(summary.planetarium_dome_capacity, 12);
        assert_eq!(summary.tickets_available(), 12);
    }

    #[tokio::test]
    async fn test_create_requires_existing_show_and_dome() {
        let f = setup().await;

        let bad_show = ShowSessionInput {
            astronomy_show_id: 999,
            ..input(&f, at(18))
        };
        let bad_dome = ShowSessionInput {
            planetarium_dome_id: 999,
            ..input(&f, at(18))
        };

        for bad in [bad_show, bad_dome] {
            assert!(matches!(
                f.service.create(bad).await,
                Err(ShowSessionServiceError::ValidationError(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_detail_lists_taken_places() {
        let f = setup().await;
        let session = f.service.create(input(&f, at(18))).await.unwrap();
        sell_seat(&f, session.id, 2, 3).await;
        sell_seat(&f, session.id, 1, 1).await;

        let detail = f.service.get_detail(session.id).await.unwrap();
        assert_eq!(detail.astronomy_show.title, "Orion");
        assert_eq!(detail.planetarium_dome, f.dome);
        let places: Vec<(i32, i32)> = detail.taken_places.iter().map(|p| (p.row, p.seat)).collect();
        assert_eq!(places, vec![(1, 1), (2, 3)]);

        assert_eq!(f.service.get_summary(session.id).await.unwrap().tickets_available(), 10);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let f = setup().await;
        let session = f.service.create(input(&f, at(18))).await.unwrap();

        let moved = f.service.update(session.id, input(&f, at(20))).await.unwrap();
        assert_eq!(moved.show_time, at(20));

        f.service.delete(session.id).await.unwrap();
        assert!(matches!(
            f.service.get_detail(session.id).await,
            Err(ShowSessionServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.delete(session.id).await,
            Err(ShowSessionServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.update(session.id, input(&f, at(21))).await,
            Err(ShowSessionServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_refuses_dome_that_drops_sold_seats() {
        let f = setup().await;
        let session = f.service.create(input(&f, at(18))).await.unwrap();
        sell_seat(&f, session.id, 3, 4).await;

        let small = SqlxPlanetariumDomeRepository::new(f.pool.clone())
            .create(&PlanetariumDome::new("Small".to_string(), 2, 2))
            .await
            .unwrap();
        let err = f
            .service
            .update(
                session.id,
                ShowSessionInput {
                    planetarium_dome_id: small.id,
                    ..input(&f, at(18))
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ShowSessionServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_by_date() {
        let f = setup().await;
        f.service.create(input(&f, at(20))).await.unwrap();
        f.service.create(input(&f, at(9))).await.unwrap();
        f.service
            .create(input(&f, Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap()))
            .await
            .unwrap();

        let filter = ShowSessionFilter {
            date: NaiveDate::from_ymd_opt(2025, 3, 14),
            astronomy_show_id: None,
        };
        let times: Vec<DateTime<Utc>> = f
            .service
            .list(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.show_time)
            .collect();

        assert_eq!(times, vec![at(9), at(20)]);
    }
}
