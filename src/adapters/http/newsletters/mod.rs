//! Newsletter REST surface.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::NewsletterAppState;
pub use routes::newsletter_routes;
