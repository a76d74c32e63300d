use serde::{Deserialize, Serialize};
use url::Url;

/// Address recorded when a visit arrived without a referrer header.
pub const DIRECT: &str = "<direct>";

/// One `(referrer, visits)` pair as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerRecord {
    pub address: String,
    pub count: u64,
}

impl ReferrerRecord {
    pub fn new(address: impl Into<String>, count: u64) -> Self {
        Self {
            address: address.into(),
            count,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.address == DIRECT
    }
}

impl<S: Into<String>> From<(S, u64)> for ReferrerRecord {
    fn from((address, count): (S, u64)) -> Self {
        Self::new(address, count)
    }
}

/// A referrer address split into its grouping key and the path segments
/// below it.
///
/// Anything that is not an absolute URL with a host (`<direct>` included)
/// keeps the raw string as its key and has no segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedAddress {
    pub host: String,
    pub segments: Vec<String>,
    pub linkable: bool,
}

impl ParsedAddress {
    pub(crate) fn parse(address: &str) -> Self {
        if address == DIRECT {
            return Self::literal(address);
        }

        match Url::parse(address) {
            Ok(url) => match url.host_str() {
                Some(host) => Self {
                    host: host.to_string(),
                    segments: url
                        .path_segments()
                        .map(|segments| {
                            segments
                                .filter(|s| !s.is_empty())
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default(),
                    linkable: true,
                },
                None => Self::literal(address),
            },
            Err(_) => Self::literal(address),
        }
    }

    fn literal(address: &str) -> Self {
        Self {
            host: address.to_string(),
            segments: Vec::new(),
            linkable: false,
        }
    }
}

/// Host of `address` when it parses as a URL with a host, else the raw string.
pub fn host_or_literal(address: &str) -> String {
    Url::parse(address)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| address.to_string())
}
