//! Login session and stored credentials.
//!
//! - `Session`: the token and account data from one `EduLink.Login`
//! - `CredentialStore`: the EduLink password in the OS keychain
//!
//! Sessions live for a single pass and are never written to disk or cache.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::Session;
