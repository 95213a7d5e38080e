//! Static OpenAPI 3.0.3 description of the API, served at `GET /openapi.json`.

use std::convert::Infallible;

use serde_json::{Value, json};

use crate::Request;

pub async fn document(_req: Request) -> Result<Value, Infallible> {
    Ok(openapi())
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": {
            "type": "object",
            "properties": { "error": { "type": "string" } }
        }}}
    })
}

fn credentials_body() -> Value {
    json!({
        "required": true,
        "content": { "application/json": { "schema": {
            "type": "object",
            "required": ["email", "password"],
            "properties": { "email": { "type": "string" }, "password": { "type": "string" } }
        }}}
    })
}

fn session_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": {
            "type": "object",
            "properties": {
                "user": { "$ref": "#/components/schemas/User" },
                "token": { "type": "string" }
            }
        }}}
    })
}

fn id_param() -> Value {
    json!([{ "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } }])
}

fn openapi() -> Value {
    let bearer = json!([{ "bearerAuth": [] }]);
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "sluice todos API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Minimal auth + todos API."
        },
        "servers": [{ "url": "http://127.0.0.1:5000" }],
        "paths": {
            "/health": { "get": {
                "summary": "Health",
                "responses": { "200": { "description": "OK", "content": { "application/json": { "schema": {
                    "type": "object", "properties": { "status": { "type": "string" } }
                }}}}}
            }},
            "/hello": { "get": {
                "summary": "Hello",
                "responses": { "200": { "description": "OK" } }
            }},
            "/auth/register": { "post": {
                "summary": "Register",
                "requestBody": credentials_body(),
                "responses": {
                    "200": session_response("Registered"),
                    "400": { "$ref": "#/components/responses/BadRequest" },
                    "409": { "$ref": "#/components/responses/Conflict" }
                }
            }},
            "/auth/login": { "post": {
                "summary": "Login",
                "requestBody": credentials_body(),
                "responses": {
                    "200": session_response("Logged in"),
                    "401": { "$ref": "#/components/responses/Unauthorized" }
                }
            }},
            "/me": { "get": {
                "summary": "Current user",
                "security": bearer,
                "responses": {
                    "200": { "description": "OK" },
                    "401": { "$ref": "#/components/responses/Unauthorized" }
                }
            }},
            "/todos": {
                "get": {
                    "summary": "List todos",
                    "security": bearer,
                    "parameters": [
                        { "name": "page", "in": "query", "schema": { "type": "integer", "default": 1, "minimum": 1 } },
                        { "name": "limit", "in": "query", "schema": { "type": "integer", "default": 10, "minimum": 1, "maximum": 50 } }
                    ],
                    "responses": {
                        "200": { "description": "OK", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/TodoList" } } } },
                        "400": { "$ref": "#/components/responses/BadRequest" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                },
                "post": {
                    "summary": "Create todo",
                    "security": bearer,
                    "requestBody": { "required": true, "content": { "application/json": { "schema": {
                        "type": "object", "required": ["title"], "properties": { "title": { "type": "string" } }
                    }}}},
                    "responses": {
                        "201": { "description": "Created", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Todo" } } } },
                        "400": { "$ref": "#/components/responses/BadRequest" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                }
            },
            "/todos/{id}/toggle": { "patch": {
                "summary": "Toggle done",
                "security": bearer,
                "parameters": id_param(),
                "responses": {
                    "200": { "description": "OK", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Todo" } } } },
                    "401": { "$ref": "#/components/responses/Unauthorized" },
                    "404": { "$ref": "#/components/responses/NotFound" }
                }
            }},
            "/todos/{id}": { "delete": {
                "summary": "Delete todo",
                "security": bearer,
                "parameters": id_param(),
                "responses": {
                    "200": { "description": "Deleted" },
                    "401": { "$ref": "#/components/responses/Unauthorized" },
                    "404": { "$ref": "#/components/responses/NotFound" }
                }
            }}
        },
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            },
            "schemas": {
                "User": { "type": "object", "properties": {
                    "id": { "type": "integer" }, "email": { "type": "string" }
                }},
                "Todo": { "type": "object", "properties": {
                    "id": { "type": "integer" }, "title": { "type": "string" }, "done": { "type": "boolean" }
                }},
                "TodoList": { "type": "object", "properties": {
                    "items": { "type": "array", "items": { "$ref": "#/components/schemas/Todo" } },
                    "page": { "type": "integer" },
                    "limit": { "type": "integer" },
                    "total": { "type": "integer" }
                }}
            },
            "responses": {
                "BadRequest": error_response("Bad request"),
                "Unauthorized": error_response("Unauthorized"),
                "NotFound": error_response("Not found"),
                "Conflict": error_response("Conflict"),
                "TooManyRequests": error_response("Rate limit exceeded")
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_path_is_described() {
        let doc = openapi();
        let paths = doc["paths"].as_object().unwrap();
        for path in ["/health", "/hello", "/auth/register", "/auth/login", "/me", "/todos", "/todos/{id}/toggle", "/todos/{id}"] {
            assert!(paths.contains_key(path), "{path} missing");
        }
        assert_eq!(doc["paths"]["/me"]["get"]["security"][0]["bearerAuth"], json!([]));
    }
}
