pub mod activities;
pub mod auth;
pub mod chat_histories;
pub mod container_types;
pub mod containers;
pub mod health;
pub mod metrics;
pub mod restaurants;
pub mod swagger;
pub mod users;
