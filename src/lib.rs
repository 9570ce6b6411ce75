#![doc = include_str!("../README.md")]

pub mod error;
#[cfg(feature = "middleware")]
pub mod middleware;
#[cfg(feature = "oauth")]
pub mod oauth;
#[cfg(feature = "oauth")]
pub mod orchestrator;
#[cfg(feature = "oauth")]
pub mod pkce;
#[cfg(feature = "oauth")]
pub mod presentation;
pub mod provider;
pub mod session;
pub mod types;

// Re-exports for convenient access
pub use error::Error;
#[cfg(feature = "oauth")]
pub use oauth::{AuthClient, AuthorizationRequest};
#[cfg(feature = "oauth")]
pub use orchestrator::{SessionOrchestrator, TokenRefresher};
#[cfg(feature = "oauth")]
pub use pkce::{PkcePair, generate_state};
#[cfg(feature = "oauth")]
pub use presentation::{ClientAction, ResourceClient, ResourceError, react};
pub use provider::{ProfileMapper, ProviderConfig, ProviderEndpoints};
pub use session::{
    Account, RefreshOutcome, SessionError, SessionRecord, SessionView, TokenState, now_millis,
};
pub use types::{Claims, Subject, TokenResponse, UserProfile};
