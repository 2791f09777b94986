mod basic;
mod middleware;
mod password;
pub mod policy;
mod session;
mod token;
mod verifier;

pub use basic::{BasicCredentials, parse_basic_auth};
pub use middleware::{AuthContext, SessionLookupFailed};
pub use password::PasswordHasher;
pub use policy::{Decision, DenyReason, GrantLookup, decide, requires_actor};
pub use session::{SESSION_COOKIE_NAME, SESSION_MAX_AGE_SECS, SessionSigner, session_cookie_value};
pub use token::{generate_access_token, hash_access_token};
pub use verifier::CredentialVerifier;
