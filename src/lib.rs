//! Client-side state and network layer for the study/music mini-program.
//!
//! - `gateway`: request wrapper (base URL, headers, token, envelope checks)
//! - `api`: typed REST endpoints on top of the gateway
//! - `model`: session and playback stores plus wire types
//! - `storage`, `notify`, `auth`: platform capabilities the stores depend on

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod notify;
pub mod storage;

pub use config::AppConfig;
pub use error::{ApiError, ApiFailure};
pub use gateway::{Gateway, RequestOptions};
pub use model::{PlaybackStore, SessionStore};
