//! Parameter resolution against hand-built request contexts

use std::sync::Arc;

use bytes::Bytes;
use routetree::controller::Argument;
use routetree::pipeline::{decode_body, resolve_params, RequestContext, ResolveOptions};
use routetree::tree::{MediaType, ParamDescriptor, ParamKind};
use routetree::validator_cache::{JsonSchemaEngine, ValidatorCache};
use routetree::RouteError;
use serde::Deserialize;
use serde_json::{json, Value};

fn context(uri: &str, content_type: Option<&str>, body: &'static str) -> Arc<RequestContext> {
    let mut builder = http::Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let req = builder.body(Bytes::from_static(body.as_bytes())).unwrap();
    Arc::new(RequestContext::from_request(
        req,
        [("id".to_string(), "42".to_string())],
    ))
}

fn values(args: &routetree::Arguments) -> Vec<Value> {
    args.iter()
        .map(|arg| match arg {
            Argument::Context(_) => json!("<context>"),
            Argument::Value(v) => v.clone(),
        })
        .collect()
}

#[tokio::test]
async fn test_arguments_follow_index_not_declaration_order() {
    let params = vec![
        ParamDescriptor::query(3),
        ParamDescriptor::body(1),
        ParamDescriptor::context(2),
        ParamDescriptor::path_params(0),
    ];
    let ctx = context("/things/42?q=x", Some("application/json"), r#"{"a":1}"#);
    let args = resolve_params(&params, &ctx, &JsonSchemaEngine, ResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(
        values(&args),
        vec![json!({"id": "42"}), json!({"a": 1}), json!("<context>"), json!({"q": "x"})]
    );
    assert!(Arc::ptr_eq(&args.context(2).unwrap(), &ctx));
}

#[tokio::test]
async fn test_first_failure_aborts_resolution() {
    let params = vec![
        ParamDescriptor::path_params(0).with_schema(json!({"type": "object"})),
        ParamDescriptor::body(1).with_schema(json!({
            "type": "object",
            "required": ["name"]
        })),
    ];
    let ctx = context("/things/42", Some("application/json"), r#"{"other":true}"#);
    let err = resolve_params(&params, &ctx, &ValidatorCache::default(), ResolveOptions::default())
        .await
        .unwrap_err();
    match err {
        RouteError::Validation { kind, violations } => {
            assert_eq!(kind, ParamKind::Body);
            assert_eq!(violations.len(), 1);
            assert!(violations[0].message.contains("name"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_form_hint_overrides_content_type() {
    let params = vec![ParamDescriptor::body(0).with_media_type(MediaType::Form)];
    let ctx = context("/things", Some("application/json"), "name=Dune&genre=scifi");
    let args = resolve_params(&params, &ctx, &JsonSchemaEngine, ResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(values(&args), vec![json!({"name": "Dune", "genre": "scifi"})]);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let params = vec![ParamDescriptor::body(0)];
    let ctx = context("/things", Some("application/json"), "{broken");
    let err = resolve_params(&params, &ctx, &JsonSchemaEngine, ResolveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RouteError::BodyDecode { .. }));
    assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_body_sniffing() {
    let body = Bytes::from_static(b"{\"a\":1}");
    assert_eq!(
        decode_body(&body, None, Some("application/vnd.api+json")).await.unwrap(),
        json!({"a": 1})
    );
    assert_eq!(decode_body(&body, None, Some("text/plain")).await.unwrap(), Value::Null);
    assert_eq!(decode_body(&body, None, None).await.unwrap(), Value::Null);
    assert_eq!(
        decode_body(&Bytes::new(), Some(MediaType::Json), None).await.unwrap(),
        Value::Null
    );
    assert!(decode_body(&body, None, Some("multipart/related; boundary=x")).await.is_err());
}

#[tokio::test]
async fn test_form_hint_reads_multipart() {
    let params = vec![ParamDescriptor::body(0).with_media_type(MediaType::Form)];
    let ctx = context(
        "/things",
        Some("multipart/form-data; boundary=XX"),
        "--XX\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nDune\r\n--XX--\r\n",
    );
    let args = resolve_params(&params, &ctx, &JsonSchemaEngine, ResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(values(&args), vec![json!({"name": "Dune"})]);
}

#[tokio::test]
async fn test_query_repeated_key_keeps_first() {
    let params = vec![ParamDescriptor::query(0)];
    let ctx = context("/things?tag=a&tag=b&page=2", None, "");
    assert_eq!(ctx.query_param("tag"), Some("a"));
    let args = resolve_params(&params, &ctx, &JsonSchemaEngine, ResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(values(&args), vec![json!({"tag": "a", "page": "2"})]);
}

#[tokio::test]
async fn test_coerced_arguments_parse_into_types() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Paging {
        page: u32,
        tags: Vec<String>,
        archived: bool,
    }

    let schema = json!({
        "type": "object",
        "properties": {
            "page": {"type": "integer"},
            "tags": {"type": "array", "items": {"type": "string"}},
            "archived": {"type": "boolean"}
        },
        "required": ["page", "tags", "archived"]
    });
    let params = vec![ParamDescriptor::query(0).with_schema(schema)];
    let ctx = context("/things?page=3&tags=a,b&archived=false", None, "");
    let args = resolve_params(
        &params,
        &ctx,
        &JsonSchemaEngine,
        ResolveOptions {
            coerce_params: true,
        },
    )
    .await
    .unwrap();

    let paging: Paging = args.parse(0).unwrap();
    assert_eq!(
        paging,
        Paging {
            page: 3,
            tags: vec!["a".into(), "b".into()],
            archived: false,
        }
    );
}

#[tokio::test]
async fn test_no_params_yields_empty_arguments() {
    let ctx = context("/things", None, "");
    let args = resolve_params(&[], &ctx, &JsonSchemaEngine, ResolveOptions::default())
        .await
        .unwrap();
    assert!(args.is_empty());
}
