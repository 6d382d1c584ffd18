//! Model module - application state and data types
//!
//! - `types`: user, authentication and content wire types
//! - `session`: session store (login state, token, profile)
//! - `playback`: playback store (track list, cursor, transport)

mod playback;
mod session;
mod types;

pub use types::{
    AvatarUpload, CarouselItem, LoginRequest, LoginResponse, LoginType, PageParams, PhoneLoginParams,
    RegisterRequest, TokenRefresh, USER_STATUS_ACTIVE, UpdateUserRequest, User, UserLoginLog, UserStats,
    VerifyCodeLoginParams, WechatLoginParams,
};

pub use playback::{PlayMode, PlaybackStore, PlayerState, Playlist, Track};

pub use session::{LOGOUT_REDIRECT_DELAY, Session, SessionStore};
