pub mod error;
pub mod health;
pub mod identity;
pub mod middleware;
pub mod tracing;
