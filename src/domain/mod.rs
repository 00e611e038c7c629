//! Domain models for Mailcraft

pub mod email;
pub mod template;

pub use email::*;
pub use template::*;
