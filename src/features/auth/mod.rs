pub mod clients;
pub mod dtos;
pub mod guest;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod services;

pub use guest::GuestIdentityIssuer;
pub use routes::routes;
pub use services::IdentityService;
