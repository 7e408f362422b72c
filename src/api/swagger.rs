use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "aQRo API",
        version = "1.0.0",
        description = "Backend for the aQRo reusable container program. \n\n**Authentication:** everything under `/api/v1` except login, register, refresh and verify requires a JWT Bearer token.\n\n**Roles:**\n- `customer`: registers containers and earns rebates\n- `staff`: processes returns for their own restaurant\n- `admin`: manages restaurants, container types, containers and users",
        contact(
            name = "aQRo Team",
            email = "support@aqro.ph"
        )
    ),
    paths(
        // Auth
        crate::api::auth::login,
        crate::api::auth::register,
        crate::api::auth::refresh_token,
        crate::api::auth::verify_token,
        crate::api::auth::get_me,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Restaurants
        crate::api::restaurants::get_restaurants,
        crate::api::restaurants::get_restaurant,
        crate::api::restaurants::create_restaurant,
        crate::api::restaurants::update_restaurant,
        crate::api::restaurants::delete_restaurant,
        crate::api::restaurants::set_rebate,
        crate::api::restaurants::remove_rebate,

        // Container types
        crate::api::container_types::get_container_types,
        crate::api::container_types::get_container_type,
        crate::api::container_types::create_container_type,
        crate::api::container_types::update_container_type,
        crate::api::container_types::delete_container_type,

        // Containers
        crate::api::containers::get_containers,
        crate::api::containers::get_container_stats,
        crate::api::containers::get_container_by_qr,
        crate::api::containers::get_container,
        crate::api::containers::generate_containers,
        crate::api::containers::register_container,
        crate::api::containers::process_rebate,
        crate::api::containers::update_container_status,
        crate::api::containers::delete_container,

        // Users
        crate::api::users::get_users,
        crate::api::users::get_user,
        crate::api::users::get_user_summary,
        crate::api::users::create_user,
        crate::api::users::update_user,
        crate::api::users::delete_user,

        // Activities
        crate::api::activities::get_activities,
        crate::api::activities::create_activity,
        crate::api::activities::delete_activity,

        // Chat
        crate::api::chat_histories::get_chat_history,
        crate::api::chat_histories::append_chat_message,
        crate::api::chat_histories::clear_chat_history,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::RefreshTokenRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::VerifyTokenResponse,
            crate::models::UserInfo,
            crate::models::Role,

            // Health & Metrics
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,

            // Restaurants
            crate::models::CreateRestaurantRequest,
            crate::models::UpdateRestaurantRequest,
            crate::models::RebateRateInput,
            crate::models::RebateRateResponse,
            crate::models::RestaurantResponse,

            // Containers
            crate::models::ContainerStatus,
            crate::models::CreateContainerTypeRequest,
            crate::models::UpdateContainerTypeRequest,
            crate::models::ContainerTypeResponse,
            crate::models::GenerateContainersRequest,
            crate::models::RegisterContainerRequest,
            crate::models::ProcessRebateRequest,
            crate::models::UpdateContainerStatusRequest,
            crate::models::ContainerResponse,
            crate::models::RebateReceipt,
            crate::models::ContainerStats,

            // Users & activities
            crate::models::CreateUserRequest,
            crate::models::UpdateUserRequest,
            crate::models::ActivityKind,
            crate::models::CreateActivityRequest,
            crate::models::ActivityResponse,
            crate::models::ActivitySummary,

            // Chat
            crate::models::ChatSender,
            crate::models::ChatMessage,
            crate::models::AppendMessageRequest,
            crate::models::ChatHistoryResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Customer sign up, login, token refresh and verification."),
        (name = "Health", description = "Health check and Prometheus metrics."),
        (name = "Restaurants", description = "Partner restaurants and their rebate tables."),
        (name = "Container Types", description = "Catalog of container types with price and max uses."),
        (name = "Containers", description = "QR-tagged containers: generation, registration, rebates and status changes."),
        (name = "Users", description = "Account management for customers, staff and admins."),
        (name = "Activities", description = "Audit log of registrations, rebates and status changes."),
        (name = "Chat", description = "Per-user assistant chat history."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Paste the access token returned by /auth/login"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_lifecycle_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/v1/containers/process-rebate"));
        assert!(paths.contains_key("/api/v1/restaurants/{id}/rebates/{type_id}"));
        assert!(doc.components.unwrap().security_schemes.contains_key("bearer_auth"));
    }
}
