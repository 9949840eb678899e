use utoipa::OpenApi;

/// Root OpenAPI document; domain documents are nested at their mount paths.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lending API",
        version = "0.1.0",
        description = "Lending catalog with idempotent commands"
    ),
    servers((url = "/api", description = "API base path")),
    nest(
        (path = "/items", api = domain_lending::ApiDoc)
    )
)]
pub struct ApiDoc;
