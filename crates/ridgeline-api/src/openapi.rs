use crate::error_mapping::API_ERROR_SCHEMA_REF;
use serde_json::{json, Map, Value};

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {"application/json": {"schema": {"$ref": API_ERROR_SCHEMA_REF}}}
    })
}

fn json_body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": {"application/json": {"schema": {"$ref": format!("#/components/schemas/{schema}")}}}
    })
}

fn path_param(name: &str) -> Value {
    json!({"name": name, "in": "path", "required": true, "schema": {"type": "string"}})
}

fn admin_op(summary: &str, params: &[&str], body: Option<&str>, ok: &str) -> Value {
    let mut op = Map::new();
    op.insert("summary".to_string(), json!(summary));
    op.insert("security".to_string(), json!([{"adminToken": []}, {"adminCookie": []}]));
    if !params.is_empty() {
        op.insert(
            "parameters".to_string(),
            Value::Array(params.iter().map(|p| path_param(p)).collect()),
        );
    }
    if let Some(schema) = body {
        op.insert("requestBody".to_string(), json_body(schema));
    }
    op.insert(
        "responses".to_string(),
        json!({
            "200": {"description": ok},
            "401": error_response("missing or invalid admin credentials"),
            "404": error_response("not found"),
            "422": error_response("validation failed"),
            "503": error_response("both storage backends unavailable")
        }),
    );
    Value::Object(op)
}

/// OpenAPI 3 description of the JSON endpoints.
#[must_use]
pub fn openapi_v1_spec() -> Value {
    json!({
      "openapi": "3.0.3",
      "info": {"title": "ridgeline admin API", "version": crate::API_VERSION},
      "paths": {
        "/healthz": {"get": {"responses": {"200": {"description": "ok"}}}},
        "/readyz": {"get": {"responses": {"200": {"description": "ready"}, "503": {"description": "no storage backend healthy"}}}},
        "/metrics": {"get": {"responses": {"200": {"description": "prometheus metrics"}}}},
        "/api/version": {"get": {"responses": {"200": {"description": "build and api version"}}}},
        "/api/revalidate": {
          "post": {
            "summary": "Drop cached pages by path or tag",
            "parameters": [
              {"name": "path", "in": "query", "schema": {"type": "string"}},
              {"name": "tag", "in": "query", "schema": {"type": "string"}},
              {"name": "x-revalidate-secret", "in": "header", "schema": {"type": "string"}}
            ],
            "requestBody": {"required": false, "content": {"application/json": {"schema": {"$ref": "#/components/schemas/RevalidateRequest"}}}},
            "responses": {
              "200": {"description": "revalidated"},
              "400": error_response("nothing to revalidate"),
              "401": error_response("bad secret")
            }
          }
        },
        "/api/revalidate/all": {
          "post": {"summary": "Drop every cached page", "responses": {"200": {"description": "revalidated"}, "401": error_response("bad secret")}}
        },
        "/api/admin/activities": {
          "get": admin_op("List activities", &[], None, "activity list"),
          "post": admin_op("Create an activity", &[], Some("ActivityUpsert"), "created")
        },
        "/api/admin/activities/{slug}": {
          "get": admin_op("Get an activity", &["slug"], None, "activity"),
          "put": admin_op("Replace an activity", &["slug"], Some("ActivityUpsert"), "saved"),
          "delete": admin_op("Delete an activity", &["slug"], None, "deleted")
        },
        "/api/admin/pages": {"get": admin_op("List pages", &[], None, "page list")},
        "/api/admin/pages/{kind}/{locale}": {
          "get": admin_op("Get a page", &["kind", "locale"], None, "page"),
          "put": admin_op("Replace a page", &["kind", "locale"], Some("PageUpsert"), "saved"),
          "delete": admin_op("Delete a page", &["kind", "locale"], None, "deleted")
        },
        "/api/admin/settings": {"get": admin_op("All settings sections", &[], None, "settings")},
        "/api/admin/settings/{section}": {
          "get": admin_op("One settings section", &["section"], None, "settings"),
          "put": admin_op("Replace a settings section", &["section"], Some("SettingsUpdate"), "saved")
        },
        "/api/admin/inquiries": {"get": admin_op("Contact form submissions, newest first", &[], None, "inquiry list")},
        "/api/admin/upload": {
          "post": {
            "summary": "Upload an image",
            "security": [{"adminToken": []}, {"adminCookie": []}],
            "requestBody": {"required": true, "content": {"multipart/form-data": {"schema": {
              "type": "object",
              "required": ["file"],
              "properties": {"file": {"type": "string", "format": "binary"}, "folder": {"type": "string"}}
            }}}},
            "responses": {
              "200": {"description": "stored"},
              "401": error_response("missing or invalid admin credentials"),
              "413": error_response("file too large"),
              "415": error_response("not an accepted image type"),
              "502": error_response("upload backend failed")
            }
          },
          "delete": {
            "summary": "Delete an uploaded image",
            "security": [{"adminToken": []}, {"adminCookie": []}],
            "parameters": [{"name": "path", "in": "query", "required": true, "schema": {"type": "string"}}],
            "responses": {"200": {"description": "deleted"}, "401": error_response("missing or invalid admin credentials")}
          }
        },
        "/api/admin/sync/drift": {"get": admin_op("Differences between database and files", &[], None, "drift report")},
        "/api/admin/sync": {"post": admin_op("Copy documents between backends", &[], Some("SyncRequest"), "sync report")},
        "/api/admin/debug": {"get": admin_op("Debug dashboard data", &[], None, "dashboard snapshot")}
      },
      "components": {
        "securitySchemes": {
          "adminToken": {"type": "http", "scheme": "bearer"},
          "adminCookie": {"type": "apiKey", "in": "cookie", "name": "ridgeline_admin"}
        },
        "schemas": {
          "ApiError": {
            "type": "object",
            "required": ["error"],
            "properties": {"error": {
              "type": "object",
              "required": ["code", "message", "details", "request_id"],
              "properties": {
                "code": {"type": "string"},
                "message": {"type": "string"},
                "details": {"type": "object"},
                "request_id": {"type": "string"}
              }
            }}
          },
          "ActivityUpsert": {
            "type": "object",
            "required": ["difficulty", "duration_minutes", "translations"],
            "properties": {
              "slug": {"type": "string"},
              "category": {"type": "string"},
              "difficulty": {"type": "string", "enum": ["easy", "moderate", "challenging", "extreme"]},
              "duration_minutes": {"type": "integer", "minimum": 1},
              "price": {"type": "object", "properties": {"amount_cents": {"type": "integer"}, "currency": {"type": "string"}}},
              "cover_image": {"type": "string"},
              "gallery": {"type": "array", "items": {"type": "string"}},
              "featured": {"type": "boolean"},
              "published": {"type": "boolean"},
              "sort_order": {"type": "integer"},
              "translations": {"type": "object", "additionalProperties": {"type": "object"}},
              "updated_at": {"type": "string", "format": "date-time", "readOnly": true}
            }
          },
          "PageUpsert": {
            "type": "object",
            "required": ["title"],
            "properties": {
              "title": {"type": "string"},
              "subtitle": {"type": "string"},
              "hero_image": {"type": "string"},
              "body": {"type": "string"},
              "meta_description": {"type": "string", "maxLength": 320},
              "kind": {"type": "string", "readOnly": true},
              "locale": {"type": "string", "readOnly": true},
              "updated_at": {"type": "string", "format": "date-time", "readOnly": true}
            }
          },
          "SettingsUpdate": {
            "type": "object",
            "required": ["values"],
            "properties": {"values": {"type": "object", "additionalProperties": {"type": "string"}}}
          },
          "RevalidateRequest": {
            "type": "object",
            "properties": {
              "paths": {"type": "array", "items": {"type": "string"}},
              "tags": {"type": "array", "items": {"type": "string"}}
            }
          },
          "SyncRequest": {
            "type": "object",
            "required": ["direction"],
            "properties": {
              "direction": {"type": "string", "enum": ["db-to-files", "files-to-db"]},
              "collections": {"type": "array", "items": {"type": "string"}},
              "force": {"type": "boolean"},
              "dry_run": {"type": "boolean"}
            }
          }
        }
      }
    })
}
