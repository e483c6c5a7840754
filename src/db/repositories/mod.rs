//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one entity.

pub mod astronomy_show;
pub mod planetarium_dome;
pub mod reservation;
pub mod session;
pub mod show_session;
pub mod show_theme;
pub mod user;

pub use astronomy_show::{AstronomyShowRepository, SqlxAstronomyShowRepository};
pub use planetarium_dome::{PlanetariumDomeRepository, SqlxPlanetariumDomeRepository};
pub use reservation::{ReservationRepository, SqlxReservationRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use show_session::{ShowSessionRepository, SqlxShowSessionRepository};
pub use show_theme::{ShowThemeRepository, SqlxShowThemeRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// `?, ?, ?` for an IN clause of `n` values
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
