//! OpenAPI documentation aggregation.

use utoipa::OpenApi;

use crate::api::models::{
    accounts::{AccountResponse, AccountStatus, AccountUpdate, Provider, Role},
    allocations::{AllocationCreate, AllocationResponse},
    auth::{AuthResponse, AuthSuccessResponse, LoginRequest, RegisterRequest},
    tools::{CategoryCreate, CategoryResponse, ToolCreate, ToolResponse, ToolStatus, ToolUpdate},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::auth::register,
        crate::api::handlers::auth::resend_verification,
        crate::api::handlers::auth::verify_email,
        crate::api::handlers::auth::login,
        crate::api::handlers::auth::logout,
        crate::api::handlers::accounts::list_accounts,
        crate::api::handlers::accounts::current_account,
        crate::api::handlers::accounts::get_account,
        crate::api::handlers::accounts::update_account,
        crate::api::handlers::accounts::delete_account,
        crate::api::handlers::tools::list_tools,
        crate::api::handlers::tools::create_tool,
        crate::api::handlers::tools::get_tool,
        crate::api::handlers::tools::update_tool,
        crate::api::handlers::tools::delete_tool,
        crate::api::handlers::tools::list_categories,
        crate::api::handlers::tools::create_category,
        crate::api::handlers::tools::delete_category,
        crate::api::handlers::allocations::checkout_tool,
        crate::api::handlers::allocations::return_tool,
        crate::api::handlers::allocations::list_allocations,
        crate::api::handlers::allocations::get_allocation,
    ),
    components(schemas(
        AccountResponse,
        AccountStatus,
        AccountUpdate,
        AllocationCreate,
        AllocationResponse,
        AuthResponse,
        AuthSuccessResponse,
        CategoryCreate,
        CategoryResponse,
        LoginRequest,
        Provider,
        RegisterRequest,
        Role,
        ToolCreate,
        ToolResponse,
        ToolStatus,
        ToolUpdate,
    )),
    tags(
        (name = "registration", description = "Email-verified account registration"),
        (name = "auth", description = "Session management"),
        (name = "accounts", description = "Account administration"),
        (name = "tools", description = "Tool inventory"),
        (name = "categories", description = "Tool categories"),
        (name = "allocations", description = "Checkouts and returns"),
    )
)]
pub struct ApiDoc;
