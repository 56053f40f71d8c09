//! A small book catalogue served from a route tree
//!
//! ```sh
//! ROUTETREE_LOG_FORMAT=pretty cargo run --example resource_service
//! curl -X PUT -H 'content-type: application/json' -d '{"name":"Dune","genre":"scifi"}' http://127.0.0.1:8080/books/1
//! curl http://127.0.0.1:8080/books/1
//! curl http://127.0.0.1:8080/openapi.json
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use anyhow::Context;
use async_trait::async_trait;
use http::StatusCode;
use routetree::adapter::{document_router, into_router, Adapter};
use routetree::controller::{unknown_method, Arguments, Controller, HandlerResponse, Singleton};
use routetree::logging::{init_logging, LogConfig};
use routetree::middleware::{MetricsMiddleware, TracingMiddleware};
use routetree::openapi::{build_document, parse_skeleton};
use routetree::tree::{MiddlewareRef, Registry};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

const SKELETON: &str = r"
openapi: 3.0.0
info:
  title: Book catalogue
  version: '1.0.0'
paths: {}
";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Book {
    name: String,
    genre: String,
}

#[derive(Default)]
struct Books {
    shelf: RwLock<BTreeMap<String, Book>>,
}

#[derive(Deserialize)]
struct IdParams {
    id: String,
}

#[async_trait]
impl Controller for Books {
    async fn invoke(&self, method: &str, args: Arguments) -> anyhow::Result<HandlerResponse> {
        match method {
            "list" => {
                let shelf = self.shelf.read().map_err(|_| anyhow::anyhow!("shelf poisoned"))?;
                Ok(HandlerResponse::ok(json!(*shelf)))
            }
            "show" => {
                let IdParams { id } = args.parse(0)?;
                let shelf = self.shelf.read().map_err(|_| anyhow::anyhow!("shelf poisoned"))?;
                Ok(match shelf.get(&id) {
                    Some(book) => HandlerResponse::ok(json!(book)),
                    None => HandlerResponse::json(StatusCode::NOT_FOUND, json!({"error": "no such book"})),
                })
            }
            "store" => {
                let IdParams { id } = args.parse(0)?;
                let book: Book = args.parse(1)?;
                let ctx = args.context(2)?;
                info!(request_id = %ctx.request_id, id = %id, "Storing book");
                self.shelf
                    .write()
                    .map_err(|_| anyhow::anyhow!("shelf poisoned"))?
                    .insert(id, book.clone());
                Ok(HandlerResponse::json(StatusCode::CREATED, json!(book)))
            }
            other => Err(unknown_method("Books", other)),
        }
    }
}

#[derive(Default)]
struct Health;

#[async_trait]
impl Controller for Health {
    async fn invoke(&self, method: &str, _args: Arguments) -> anyhow::Result<HandlerResponse> {
        match method {
            "status" => Ok(HandlerResponse::ok(json!({"status": "ok"}))),
            other => Err(unknown_method("Health", other)),
        }
    }
}

fn declare(registry: &mut Registry, metrics: MiddlewareRef) -> anyhow::Result<()> {
    let id = json!({
        "type": "object",
        "properties": {"id": {"type": "string", "pattern": "^[0-9]+$"}},
        "required": ["id"]
    });
    let book = json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "minLength": 1},
            "genre": {"type": "string"}
        },
        "required": ["name", "genre"]
    });

    let _ = registry
        .controller::<Health>()
        .base_path("/health")
        .route("status", |r| {
            r.get("/").response("200", "application/json", "Service is up", None::<serde_json::Value>);
        });

    let _ = registry
        .controller::<Books>()
        .base_path("/books")
        .middleware(Arc::new(TracingMiddleware))
        .middleware(metrics)
        .route("list", |r| {
            r.get("/")
                .response("200", "application/json", "Every book on the shelf", None::<serde_json::Value>);
        })
        .route("show", |r| {
            r.get("/:id")
                .path_params(0, id.clone())
                .response("200", "application/json", "One book", book.clone())
                .response("404", "application/json", "Unknown id", None::<serde_json::Value>);
        })
        .route("store", |r| {
            r.put("/:id")
                .path_params(0, id.clone())
                .body(1, book.clone())
                .context(2)
                .secured("bearer", &["books:write"])
                .response("201", "application/json", "Stored", book.clone());
        })
        .nested::<Health>("health")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(&LogConfig::from_env())?;

    let metrics = Arc::new(MetricsMiddleware::new());
    let mut registry = Registry::new();
    declare(&mut registry, Arc::clone(&metrics) as MiddlewareRef)?;

    let skeleton = parse_skeleton(SKELETON, true)?;
    let document = build_document::<Books>(&registry, &skeleton)?;

    let adapter = Adapter::from_env().with_container(Singleton::new());
    let app = into_router::<Books>(&adapter, &registry)?
        .merge(document_router("/openapi.json", &document)?);

    let addr: SocketAddr = std::env::var("ROUTETREE_DEMO_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()
        .context("invalid ROUTETREE_DEMO_ADDR")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "Book catalogue listening");
    axum::serve(listener, app).await?;
    Ok(())
}
