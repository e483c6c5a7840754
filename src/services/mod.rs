//! Services layer - business logic
//!
//! Services validate input, coordinate repositories and the cache, and
//! report failures through one `thiserror` enum each. Repository errors
//! arrive as `anyhow::Error` and surface as `InternalError`.

pub mod astronomy_show;
pub mod password;
pub mod planetarium_dome;
pub mod reservation;
pub mod show_session;
pub mod show_theme;
pub mod user;

pub use astronomy_show::{AstronomyShowService, AstronomyShowServiceError};
pub use password::{hash_password, verify_password};
pub use planetarium_dome::{PlanetariumDomeService, PlanetariumDomeServiceError};
pub use reservation::{ReservationService, ReservationServiceError};
pub use show_session::{ShowSessionService, ShowSessionServiceError};
pub use show_theme::{ShowThemeService, ShowThemeServiceError};
pub use user::{UserService, UserServiceError};
