use std::collections::BTreeMap;
use std::convert::Infallible;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Uri};
use serde_json::{json, Map, Value};

use crate::error::RouteError;
use crate::ids::RequestId;
use crate::tree::MediaType;

/// Everything the pipeline knows about one request
///
/// The request line, headers and extensions are kept as [`http::request::Parts`];
/// the body is fully buffered before parameter resolution starts.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub parts: Parts,
    /// Path placeholders captured by the router, e.g. `id` for `/:id`
    pub path_params: BTreeMap<String, String>,
    pub query_params: BTreeMap<String, String>,
    pub body: Bytes,
}

impl RequestContext {
    /// Build a context, parsing the query string from the URI
    ///
    /// The request id is taken from the extensions (set by middleware), then from
    /// the `x-request-id` header, and generated otherwise.
    pub fn new<I>(parts: Parts, path_params: I, body: Bytes) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let request_id = parts
            .extensions
            .get::<RequestId>()
            .copied()
            .unwrap_or_else(|| RequestId::from_headers(&parts.headers));
        let query_params = parse_query_params(parts.uri.query());
        Self {
            request_id,
            parts,
            path_params: path_params.into_iter().collect(),
            query_params,
            body,
        }
    }

    /// Build a context from a buffered request
    pub fn from_request<I>(req: http::Request<Bytes>, path_params: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let (parts, body) = req.into_parts();
        Self::new(parts, path_params, body)
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }
}

/// Parse a raw query string; a repeated key keeps its first value
#[must_use]
pub fn parse_query_params(query: Option<&str>) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    for (k, v) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        params.entry(k.into_owned()).or_insert_with(|| v.into_owned());
    }
    params
}

/// String map as a JSON object of strings
#[must_use]
pub fn string_map(map: &BTreeMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// Decode the buffered body
///
/// An explicit media type wins; otherwise the `Content-Type` header is sniffed.
/// Unrecognized or missing content types decode to `Null`, as does an empty body.
/// Form bodies are read as `multipart/form-data` when the header says so and as
/// URL-encoded pairs otherwise. Other `multipart/*` types are rejected.
pub async fn decode_body(
    body: &Bytes,
    media_type: Option<MediaType>,
    content_type: Option<&str>,
) -> Result<Value, RouteError> {
    let sniffed = sniff_media_type(content_type)?;
    let Some(media_type) = media_type.or(sniffed) else {
        return Ok(Value::Null);
    };
    if body.is_empty() {
        return Ok(Value::Null);
    }
    match media_type {
        MediaType::Json => serde_json::from_slice(body).map_err(|e| RouteError::BodyDecode {
            message: format!("invalid JSON body: {e}"),
        }),
        MediaType::Form => match multipart_boundary(content_type)? {
            Some(boundary) => decode_multipart(body.clone(), boundary).await,
            None => Ok(decode_form(body)),
        },
    }
}

fn sniff_media_type(content_type: Option<&str>) -> Result<Option<MediaType>, RouteError> {
    let Some(content_type) = content_type else {
        return Ok(None);
    };
    let content_type = content_type.to_ascii_lowercase();
    if content_type.starts_with("multipart/form-data") {
        return Ok(Some(MediaType::Form));
    }
    if content_type.starts_with("multipart/") {
        return Err(RouteError::BodyDecode {
            message: format!("unsupported body content type '{content_type}'"),
        });
    }
    if content_type.contains("form") {
        Ok(Some(MediaType::Form))
    } else if content_type.contains("json") {
        Ok(Some(MediaType::Json))
    } else {
        Ok(None)
    }
}

fn multipart_boundary(content_type: Option<&str>) -> Result<Option<String>, RouteError> {
    match content_type {
        Some(ct) if ct.to_ascii_lowercase().starts_with("multipart/form-data") => {
            multer::parse_boundary(ct).map(Some).map_err(multipart_error)
        }
        _ => Ok(None),
    }
}

fn multipart_error(err: multer::Error) -> RouteError {
    RouteError::BodyDecode {
        message: format!("invalid multipart body: {err}"),
    }
}

fn decode_form(body: &Bytes) -> Value {
    let fields: Map<String, Value> = url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect();
    Value::Object(fields)
}

/// Text fields become strings; file fields are described by name, type and size
async fn decode_multipart(body: Bytes, boundary: String) -> Result<Value, RouteError> {
    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);
    let mut fields = Map::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(ToString::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                json!({
                    "filename": file_name,
                    "contentType": content_type,
                    "size": data.len(),
                })
            }
            None => Value::String(field.text().await.map_err(multipart_error)?),
        };
        fields.insert(name, value);
    }
    Ok(Value::Object(fields))
}

/// Convert string members of `value` to the types declared under `schema.properties`
///
/// Values that fail to parse as the declared type are left as strings so that
/// validation reports them.
#[must_use]
pub fn coerce_params(value: Value, schema: &Value) -> Value {
    let Value::Object(fields) = value else {
        return value;
    };
    let properties = schema.get("properties").and_then(Value::as_object);
    let coerced = fields
        .into_iter()
        .map(|(name, field)| {
            let field_schema = properties.and_then(|p| p.get(&name));
            let field = match (&field, field_schema) {
                (Value::String(raw), Some(field_schema)) => decode_param_value(raw, field_schema),
                _ => field,
            };
            (name, field)
        })
        .collect();
    Value::Object(coerced)
}

fn decode_param_value(value: &str, schema: &Value) -> Value {
    match schema.get("type").and_then(Value::as_str) {
        Some("array") => {
            let items = schema.get("items");
            Value::Array(
                value
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(|p| convert_primitive(p.trim(), items))
                    .collect(),
            )
        }
        Some("object") => {
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
        }
        _ => convert_primitive(value, Some(schema)),
    }
}

fn convert_primitive(value: &str, schema: Option<&Value>) -> Value {
    let fallback = || Value::String(value.to_string());
    match schema.and_then(|s| s.get("type")).and_then(Value::as_str) {
        Some("integer") => value.parse::<i64>().map(Value::from).unwrap_or_else(|_| fallback()),
        Some("number") => value.parse::<f64>().map(Value::from).unwrap_or_else(|_| fallback()),
        Some("boolean") => value.parse::<bool>().map(Value::from).unwrap_or_else(|_| fallback()),
        _ => fallback(),
    }
}
