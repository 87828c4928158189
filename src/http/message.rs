//! Request description and wire framing
//!
//! A `FetchRequest` captures everything a caller can say about one fetch:
//! the URL, verb, credentials, payload and freshness policy. `encode` turns
//! it into the exact HTTP/1.0 bytes written to the transport.

use super::{Headers, Target, CRLF, HTTP_VERSION};
use crate::cache::FreshnessPolicy;
use std::fmt;

/// Content type used for form payloads
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Content type used for raw payloads when the caller does not give one
pub const DEFAULT_RAW_CONTENT_TYPE: &str = "text/xml";

/// User agent sent when the configuration does not override it
pub const DEFAULT_USER_AGENT: &str = concat!("cachefetch/", env!("CARGO_PKG_VERSION"));

/// HTTP methods
///
/// Anything outside the common verbs is carried verbatim, which is how
/// WebDAV verbs such as `PROPFIND` or `SEARCH` are sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Delete,
    Custom(String),
}

impl Method {
    /// Convert method to string
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Custom(verb) => verb,
        }
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        let verb = s.trim().to_ascii_uppercase();
        match verb.as_str() {
            "" | "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            _ => Method::Custom(verb),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload carried by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestBody<'a> {
    Empty,
    Form(&'a [(String, String)]),
    Raw {
        content_type: &'a str,
        data: &'a [u8],
    },
}

impl<'a> RequestBody<'a> {
    /// Content-Type header value and encoded payload, if any
    pub fn encode(self) -> Option<(&'a str, Vec<u8>)> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Form(fields) => {
                let encoded = ::url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields.iter())
                    .finish();
                Some((FORM_CONTENT_TYPE, encoded.into_bytes()))
            }
            RequestBody::Raw { content_type, data } => Some((content_type, data.to_vec())),
        }
    }
}

/// Fixed request headers taken from the engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDefaults {
    pub user_agent: String,
    pub referer: Option<String>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        RequestDefaults {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: None,
        }
    }
}

/// Inputs to one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    url: String,
    method: Method,
    user: String,
    password: String,
    form: Vec<(String, String)>,
    raw_body: Vec<u8>,
    raw_content_type: Option<String>,
    headers: Headers,
    policy: FreshnessPolicy,
    name: String,
}

impl FetchRequest {
    /// Start building a request for `url`
    pub fn builder(url: impl Into<String>) -> FetchRequestBuilder {
        FetchRequestBuilder {
            request: FetchRequest {
                url: url.into(),
                method: Method::Get,
                user: String::new(),
                password: String::new(),
                form: Vec::new(),
                raw_body: Vec::new(),
                raw_content_type: None,
                headers: Headers::new(),
                policy: FreshnessPolicy::NoCache,
                name: String::new(),
            },
        }
    }

    /// Plain uncached GET
    pub fn get(url: impl Into<String>) -> Self {
        FetchRequest::builder(url).build()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// Caller-chosen cache entry name, possibly empty
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extra headers supplied by the caller
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Whether an `Authorization` header will be sent
    pub fn has_credentials(&self) -> bool {
        !self.user.is_empty() && !self.password.is_empty()
    }

    /// The payload to send. Form fields win over a raw body.
    pub fn body(&self) -> RequestBody<'_> {
        if !self.form.is_empty() {
            RequestBody::Form(&self.form)
        } else if !self.raw_body.is_empty() {
            RequestBody::Raw {
                content_type: self
                    .raw_content_type
                    .as_deref()
                    .unwrap_or(DEFAULT_RAW_CONTENT_TYPE),
                data: &self.raw_body,
            }
        } else {
            RequestBody::Empty
        }
    }

    /// Verb written on the request line; form payloads are always POSTed
    pub fn effective_method(&self) -> &str {
        match self.body() {
            RequestBody::Form(_) => Method::Post.as_str(),
            _ => self.method.as_str(),
        }
    }

    /// The request headers in wire order, without the body headers
    pub fn wire_headers(&self, target: &Target, defaults: &RequestDefaults) -> Headers {
        let mut headers = Headers::new();
        headers.insert("User-Agent", defaults.user_agent.as_str());
        if let Some(referer) = defaults.referer.as_deref().filter(|r| !r.is_empty()) {
            headers.insert("Referer", referer);
        }
        headers.insert("Host", target.host_header());

        if self.has_credentials() {
            let token = openssl::base64::encode_block(
                format!("{}:{}", self.user, self.password).as_bytes(),
            );
            headers.insert("Authorization", format!("Basic {}", token));
        }

        for (name, value) in self.headers.iter() {
            headers.set(name, value);
        }
        headers
    }

    /// Frame the request as HTTP/1.0 wire bytes
    ///
    /// `Content-Type` and `Content-Length` are only sent when there is a body.
    pub fn encode(&self, target: &Target, defaults: &RequestDefaults) -> Vec<u8> {
        let mut headers = self.wire_headers(target, defaults);
        let payload = self.body().encode();
        if let Some((content_type, data)) = &payload {
            headers.set("Content-Type", *content_type);
            headers.set("Content-Length", data.len().to_string());
        }

        let mut buf = Vec::new();

        // Request line
        buf.extend_from_slice(self.effective_method().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(target.path.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(HTTP_VERSION.as_bytes());
        buf.extend_from_slice(CRLF.as_bytes());

        headers.write_to(&mut buf);

        // Empty line
        buf.extend_from_slice(CRLF.as_bytes());

        if let Some((_, data)) = payload {
            buf.extend_from_slice(&data);
        }

        buf
    }
}

/// Builder for fetch requests
#[derive(Debug, Clone)]
pub struct FetchRequestBuilder {
    request: FetchRequest,
}

impl FetchRequestBuilder {
    /// Set the HTTP method
    pub fn method(mut self, method: impl Into<Method>) -> Self {
        self.request.method = method.into();
        self
    }

    /// Basic-auth credentials, sent only when both are non-empty
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.request.user = user.into();
        self.request.password = password.into();
        self
    }

    /// Add a form field; any form field turns the request into a POST
    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.form.push((name.into(), value.into()));
        self
    }

    /// Send a raw payload such as an XML document
    pub fn raw_body(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.request.raw_body = data.into();
        self
    }

    /// Content type for the raw payload
    pub fn raw_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.request.raw_content_type = Some(content_type.into());
        self
    }

    /// Add a header, overriding a default one of the same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.set(name, value);
        self
    }

    /// Set the freshness policy
    pub fn policy(mut self, policy: FreshnessPolicy) -> Self {
        self.request.policy = policy;
        self
    }

    /// Name of the cache entry; an empty name falls back to a URL digest
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.request.name = name.into();
        self
    }

    /// Build the request
    pub fn build(self) -> FetchRequest {
        self.request
    }
}
