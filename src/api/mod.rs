//! Typed wrappers over the backend's REST endpoints.

mod auth;
mod carousel;
mod user;

pub use auth::AuthApi;
pub use carousel::{CarouselApi, DEFAULT_LIMIT, DEFAULT_PLATFORM};
pub use user::{Resource, UserApi};
