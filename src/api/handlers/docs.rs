//! Handlers for the API documentation.

use axum::{Json, extract::State, response::Html};
use serde_json::{Value, json};

use crate::state::AppState;

const DOCS_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Marketplace API</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: "/docs/openapi.json", dom_id: "#swagger-ui" });
    };
  </script>
</body>
</html>
"##;

/// `GET /docs`
pub async fn docs_page_handler() -> Html<&'static str> {
    Html(DOCS_PAGE)
}

/// `GET /docs/openapi.json`
///
/// The advertised server is `PUBLIC_HOST` over https in production and
/// `localhost:{PORT}` over http otherwise.
pub async fn openapi_handler(State(state): State<AppState>) -> Json<Value> {
    Json(openapi_document(state.docs.scheme, &state.docs.host))
}

fn openapi_document(scheme: &str, host: &str) -> Value {
    let bearer = json!([{ "bearerAuth": [] }]);

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Marketplace API",
            "description": "Classified listings marketplace",
            "version": env!("CARGO_PKG_VERSION")
        },
        "servers": [{ "url": format!("{scheme}://{host}") }],
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            },
            "schemas": {
                "ErrorEnvelope": {
                    "type": "object",
                    "required": ["statusCode", "errorKind", "message"],
                    "properties": {
                        "statusCode": { "type": "integer" },
                        "errorKind": {
                            "type": "string",
                            "enum": ["ValidationError", "AuthError", "RateLimitError",
                                     "NotFoundError", "DatabaseError", "InternalError"]
                        },
                        "message": { "type": "string" },
                        "details": {},
                        "retryAfter": { "type": "integer" }
                    }
                }
            }
        },
        "tags": [
            { "name": "auth" }, { "name": "users" }, { "name": "categories" },
            { "name": "listings" }, { "name": "search" }
        ],
        "paths": {
            "/health": { "get": { "summary": "Liveness probe" } },
            "/api/auth/login": { "post": { "tags": ["auth"], "summary": "Log in" } },
            "/api/auth/refresh": {
                "post": { "tags": ["auth"], "summary": "Refresh a credential", "security": bearer }
            },
            "/api/users/register": { "post": { "tags": ["users"], "summary": "Register" } },
            "/api/users/profile": {
                "get": { "tags": ["users"], "summary": "Current account", "security": bearer }
            },
            "/api/categories": { "get": { "tags": ["categories"], "summary": "List categories" } },
            "/api/categories/{slug}": {
                "get": { "tags": ["categories"], "summary": "Get a category" }
            },
            "/api/listings": {
                "get": { "tags": ["listings"], "summary": "Browse listings" },
                "post": {
                    "tags": ["listings"],
                    "summary": "Publish a listing (multipart/form-data)",
                    "security": bearer
                }
            },
            "/api/listings/{id}": {
                "get": { "tags": ["listings"], "summary": "Get a listing" },
                "delete": {
                    "tags": ["listings"],
                    "summary": "Delete own listing",
                    "security": bearer
                }
            },
            "/api/search": {
                "get": { "tags": ["search"], "summary": "Search listings", "security": bearer }
            }
        }
    })
}
