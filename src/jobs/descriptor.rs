use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type HeadersMap = BTreeMap<String, String>;

/// Names shorter than this fall back to the URL hash
pub const MIN_NAME_CHARS: usize = 3;

/// One configured fetch target, as written in the job list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub url: String,
    #[serde(default)]
    pub body: Option<RequestBody>,
    #[serde(default, deserialize_with = "headers_or_null")]
    pub headers: HeadersMap,
    #[serde(default)]
    pub name: Option<String>,
}

/// Request payload sent along with the GET
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    /// Sent verbatim
    Raw(String),
    /// Sent as `application/x-www-form-urlencoded`; non-string values are stringified
    Form(BTreeMap<String, Value>),
}

fn headers_or_null<'de, D>(deserializer: D) -> Result<HeadersMap, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<HeadersMap>::deserialize(deserializer)?.unwrap_or_default())
}

impl JobDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: None,
            headers: HeadersMap::new(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Stable identity used for the snapshot filename.
    ///
    /// A name of at least three characters is used verbatim (uniqueness is
    /// up to whoever writes the job list); anything else falls back to the
    /// MD5 hex digest of the URL.
    pub fn identity(&self) -> String {
        match self.name.as_deref() {
            Some(name) if name.chars().count() >= MIN_NAME_CHARS => name.to_string(),
            _ => url_digest(&self.url),
        }
    }
}

/// MD5 hex digest of the URL's UTF-8 bytes
pub fn url_digest(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))
}
