//! URL canonicalisation and domain scoping

mod canonical;
mod domain;

pub use canonical::{canonicalize, CanonicalUrl};
pub use domain::{registered_domain, DomainGate};
