pub mod auth;

pub use auth::{customer_auth_middleware, owner_auth_middleware, Claims};
