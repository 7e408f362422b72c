pub mod activity_service;
pub mod auth_service;
pub mod chat_service;
pub mod container_service;
pub mod container_type_service;
pub mod restaurant_service;
pub mod user_service;
