//! Data models
//!
//! Entities of the planetarium booking system (shows, themes, domes,
//! sessions, reservations, users) plus the inputs and filters the services
//! accept. HTTP representations live in `api::responses`.

mod astronomy_show;
mod pagination;
mod planetarium_dome;
mod reservation;
mod session;
mod show_session;
mod show_theme;
mod user;

pub use astronomy_show::{parse_id_list, AstronomyShow, AstronomyShowFilter, CreateAstronomyShowInput};
pub use pagination::{ListParams, PagedResult};
pub use planetarium_dome::{CreatePlanetariumDomeInput, PlanetariumDome};
pub use reservation::{CreateReservationInput, Reservation, Ticket, TicketInput, TicketWithSession};
pub use session::Session;
pub use show_session::{SeatPosition, ShowSession, ShowSessionDetail, ShowSessionFilter, ShowSessionInput, ShowSessionSummary};
pub use show_theme::ShowTheme;
pub use user::{CreateUserInput, User, UserRole};
