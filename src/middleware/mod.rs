//! Plug-and-play OIDC login for Axum.
//!
//! Session state lives entirely in a private (encrypted and signed) cookie;
//! there is no server-side session store.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use oidc_session::middleware::{AuthConfig, router};
//!
//! let config = AuthConfig::from_env()?;
//! let endpoints = config.provider().discover(&reqwest::Client::new()).await?;
//! let app = router(config, endpoints)?;
//! axum::serve(listener, app).await?;
//! ```

mod config;
mod cookies;
mod error;
mod routes;
mod session;
mod state;

pub use config::AuthConfig;
pub use error::AuthError;
pub use routes::router;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
