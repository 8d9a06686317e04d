pub mod auth;
pub mod chapter;
pub mod discussion;
pub mod health;
pub mod resource;
pub mod users;
