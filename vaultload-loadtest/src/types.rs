//! Request method carried by load targets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::LoadTestError;

/// Method of a load target, written as its upper-case name in the target format
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HttpMethod(reqwest::Method);

impl HttpMethod {
    /// Secret reads
    pub const GET: HttpMethod = HttpMethod(reqwest::Method::GET);

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for HttpMethod {
    fn default() -> Self {
        Self::GET
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = LoadTestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        reqwest::Method::from_bytes(s.trim().to_ascii_uppercase().as_bytes())
            .map(HttpMethod)
            .map_err(|_| LoadTestError::InvalidMethod(s.to_string()))
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = LoadTestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        method.0
    }
}
