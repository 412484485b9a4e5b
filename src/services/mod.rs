//! Service layer for business logic

mod registration;

pub use registration::{CollisionPolicy, RegistrationEngine};
