//! `laundrydesk-auth`: organisational hierarchy and role-scoped authorization.
//!
//! Pure decision logic over an immutable snapshot of the user directory.
//! No storage, no UI.

pub mod authorize;
pub mod directory;
pub mod policy;
pub mod roles;
pub mod user;

pub use authorize::{AuthorizationExplanation, AuthzError, DenialKind, Operation};
pub use directory::{Directory, DirectoryViolation, WalkOutcome};
pub use policy::AuthorizationPolicy;
pub use roles::Role;
pub use user::{User, validate_reporting_line};
