//! `insti-auth` — who may do what to the ledger.
//!
//! There are no credentials in Insti Chain; identity is whatever account is
//! signed in. This crate only answers authorization questions for an
//! already-resolved [`Principal`]. Decoupled from storage.

pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, authorize, authorize_owner};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::Role;
