#![allow(dead_code)]

pub mod fixtures {
    use async_trait::async_trait;
    use routetree::controller::{unknown_method, Argument, Arguments, Controller, HandlerResponse};
    use routetree::tree::Registry;
    use serde_json::{json, Value};

    /// Arguments as JSON, with the request context rendered as its request path
    pub fn echo_args(args: &Arguments) -> Value {
        Value::Array(
            args.iter()
                .map(|arg| match arg {
                    Argument::Context(ctx) => json!({"context": ctx.uri().path()}),
                    Argument::Value(value) => value.clone(),
                })
                .collect(),
        )
    }

    pub fn id_schema() -> Value {
        json!({
            "type": "object",
            "properties": {"id": {"type": "string"}},
            "required": ["id"]
        })
    }

    pub fn query_schema() -> Value {
        json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        })
    }

    pub fn book_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "genre": {"type": "string"}
            },
            "required": ["name", "genre"]
        })
    }

    #[derive(Default)]
    pub struct Resource;

    #[async_trait]
    impl Controller for Resource {
        async fn invoke(&self, method: &str, args: Arguments) -> anyhow::Result<HandlerResponse> {
            match method {
                "get_one" | "create" => Ok(HandlerResponse::ok(echo_args(&args))),
                "broken" => Err(anyhow::anyhow!("resource store unavailable")),
                other => Err(unknown_method("Resource", other)),
            }
        }
    }

    #[derive(Default)]
    pub struct Special;

    #[async_trait]
    impl Controller for Special {
        async fn invoke(&self, method: &str, args: Arguments) -> anyhow::Result<HandlerResponse> {
            match method {
                "get_one" => Ok(HandlerResponse::ok(json!({
                    "special": true,
                    "args": echo_args(&args)
                }))),
                other => Err(unknown_method("Special", other)),
            }
        }
    }

    /// `/special` with `GET /:id`
    pub fn declare_special(registry: &mut Registry) {
        let _ = registry
            .controller::<Special>()
            .base_path("/special")
            .route("get_one", |r| {
                r.get("/:id").path_params(0, id_schema());
            });
    }

    /// `/resource` with `GET /:id`, `POST /:id`, `GET /:id/broken` and `Special` nested
    pub fn resource_registry() -> Registry {
        let mut registry = Registry::new();
        declare_special(&mut registry);
        let decl = registry
            .controller::<Resource>()
            .base_path("/resource")
            .route("get_one", |r| {
                r.get("/:id")
                    .path_params(0, id_schema())
                    .query(1, query_schema());
            })
            .route("create", |r| {
                r.post("/:id")
                    .path_params(0, id_schema())
                    .query(1, query_schema())
                    .body(2, book_schema());
            })
            .route("broken", |r| {
                r.get("/:id/broken");
            });
        decl.nested::<Special>("special")
            .expect("special declared first");
        registry
    }
}

pub mod http_util {
    use axum::body::Body;
    use axum::Router;
    use http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    /// Send one request through `router`, returning status and JSON body (`Null` if empty)
    pub async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router.oneshot(req).await.expect("infallible router");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    pub fn post_raw(uri: &str, content_type: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", content_type)
            .body(Body::from(body))
            .expect("request")
    }
}

pub mod recording {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use http::StatusCode;
    use routetree::controller::HandlerResponse;
    use routetree::middleware::{Middleware, RequestHead, ResponseHead};
    use serde_json::json;

    pub type Log = Arc<Mutex<Vec<String>>>;

    pub fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub fn entries(log: &Log) -> Vec<String> {
        log.lock().expect("log lock").clone()
    }

    /// Records `label:before` / `label:after` and tags responses with `x-seen-by`
    pub struct Recorder {
        pub label: &'static str,
        pub log: Log,
    }

    impl Middleware for Recorder {
        fn before(&self, _req: &RequestHead) -> Option<HandlerResponse> {
            self.log.lock().expect("log lock").push(format!("{}:before", self.label));
            None
        }

        fn after(&self, _req: &RequestHead, res: &mut ResponseHead, _latency: Duration) {
            self.log.lock().expect("log lock").push(format!("{}:after", self.label));
            res.headers
                .append("x-seen-by", self.label.parse().expect("header value"));
        }
    }

    /// Rejects every request lacking an `authorization` header
    pub struct RequireAuth;

    impl Middleware for RequireAuth {
        fn before(&self, req: &RequestHead) -> Option<HandlerResponse> {
            if req.headers.contains_key("authorization") {
                None
            } else {
                Some(HandlerResponse::json(
                    StatusCode::UNAUTHORIZED,
                    json!({"error": "missing credentials"}),
                ))
            }
        }
    }
}
