use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::assignments::{
    dtos as assignments_dtos, handlers as assignments_handlers, models as assignments_models,
};
use crate::features::auth::model::Role;
use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::features::comments::{dtos as comments_dtos, handlers as comments_handlers};
use crate::features::products::{
    dtos as products_dtos, handlers as products_handlers, models as products_models,
};
use crate::features::tickets::{
    dtos as tickets_dtos, handlers as tickets_handlers, models as tickets_models,
};
use crate::features::users::{dtos as users_dtos, handlers as users_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Users
        users_handlers::get_me,
        users_handlers::sync_me,
        users_handlers::list_technicians,
        users_handlers::set_category,
        // Categories
        categories_handlers::list_categories,
        categories_handlers::get_category,
        // Products
        products_handlers::list_products,
        products_handlers::list_product_options,
        products_handlers::get_product,
        products_handlers::create_product,
        products_handlers::update_product,
        // Tickets
        tickets_handlers::list_tickets,
        tickets_handlers::create_ticket,
        tickets_handlers::get_ticket,
        tickets_handlers::update_ticket,
        tickets_handlers::delete_ticket,
        tickets_handlers::create_completion,
        tickets_handlers::get_completion,
        // Assignments
        assignments_handlers::auto_assign,
        assignments_handlers::list_assignable_users,
        assignments_handlers::list_assignees,
        assignments_handlers::assign_user,
        assignments_handlers::unassign_user,
        // Comments
        comments_handlers::list_comments,
        comments_handlers::create_comment,
    ),
    components(
        schemas(
            // Shared
            Meta,
            Role,
            // Users
            users_dtos::UserResponseDto,
            users_dtos::SetCategoryDto,
            ApiResponse<users_dtos::UserResponseDto>,
            // Categories
            categories_dtos::CategoryResponseDto,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            // Products
            products_models::ProductOption,
            products_dtos::ProductResponseDto,
            products_dtos::ProductDetailsDto,
            products_dtos::ProductCreatedDto,
            products_dtos::CreateProductDto,
            products_dtos::UpdateProductDto,
            ApiResponse<Vec<products_dtos::ProductResponseDto>>,
            ApiResponse<Vec<products_models::ProductOption>>,
            ApiResponse<products_dtos::ProductDetailsDto>,
            ApiResponse<products_dtos::ProductCreatedDto>,
            ApiResponse<products_dtos::ProductResponseDto>,
            // Tickets
            tickets_models::TicketStatus,
            tickets_models::Priority,
            tickets_models::Assignee,
            tickets_dtos::TicketResponseDto,
            tickets_dtos::TicketSummaryDto,
            tickets_dtos::TicketDetailsDto,
            tickets_dtos::TicketCompletionResponseDto,
            tickets_dtos::TicketCompletionDetailsDto,
            tickets_dtos::CreateTicketDto,
            tickets_dtos::UpdateTicketDto,
            tickets_dtos::CreateCompletionDto,
            ApiResponse<Vec<tickets_dtos::TicketSummaryDto>>,
            ApiResponse<tickets_dtos::TicketResponseDto>,
            ApiResponse<tickets_dtos::TicketDetailsDto>,
            ApiResponse<tickets_dtos::TicketCompletionResponseDto>,
            ApiResponse<tickets_dtos::TicketCompletionDetailsDto>,
            // Assignments
            assignments_models::AssignmentOutcome,
            assignments_models::AssignableUser,
            assignments_dtos::AssignUserDto,
            ApiResponse<assignments_models::AssignmentOutcome>,
            ApiResponse<Vec<assignments_models::AssignableUser>>,
            ApiResponse<Vec<tickets_models::Assignee>>,
            // Comments
            comments_dtos::CommentResponseDto,
            comments_dtos::CreateCommentDto,
            ApiResponse<Vec<comments_dtos::CommentResponseDto>>,
            ApiResponse<comments_dtos::CommentResponseDto>,
        )
    ),
    tags(
        (name = "users", description = "Local user records and technician categories"),
        (name = "categories", description = "Help-desk categories"),
        (name = "products", description = "Products and their ticket codes"),
        (name = "tickets", description = "Support tickets and completions"),
        (name = "assignments", description = "Technician assignment"),
        (name = "comments", description = "Ticket comments and attachments"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Help Desk API",
        version = "0.1.0",
        description = "API documentation for the help-desk service",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_lists_ticket_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/tickets"));
        assert!(doc.paths.paths.contains_key("/api/tickets/{id}/comments"));
        assert!(doc.paths.paths.contains_key("/api/tickets/{id}/assignees/{user_id}"));
    }
}
