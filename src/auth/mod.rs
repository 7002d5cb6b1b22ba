//! Session state: token storage, cookies, and the refresh protocol.

pub mod cookies;
pub mod refresh;
pub mod session;
pub mod store;
pub mod token;

pub use cookies::SessionCookies;
pub use refresh::{RefreshCoordinator, RefreshFailure};
pub use session::{SessionListener, TerminationReason};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, ACCESS_TOKEN_KEY};
pub use token::AccessToken;
