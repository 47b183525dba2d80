use relaygate_common::{GatewayError, Result};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Ordered set of dispatcher endpoints.
///
/// Parsed from a comma-separated configuration string. The order of the
/// segments is kept because load distribution walks the set in order.
/// A successfully parsed set is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherSet {
    urls: Arc<[Url]>,
}

impl DispatcherSet {
    /// Parses a single URL or a comma-separated list of URLs.
    ///
    /// Surrounding whitespace on each segment is ignored.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Configuration` when any segment is empty, not an
    /// absolute URL, has no host, or uses a scheme other than `http`.
    pub fn parse(config: &str) -> Result<Self> {
        let urls = config
            .split(',')
            .map(|segment| parse_dispatcher(segment.trim()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { urls: urls.into() })
    }

    /// Number of dispatchers in the set.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Always `false` for a parsed set.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.urls.iter()
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    /// Dispatcher at `index`, wrapping around the set.
    pub(crate) fn get_wrapping(&self, index: usize) -> &Url {
        &self.urls[index % self.urls.len()]
    }
}

fn parse_dispatcher(segment: &str) -> Result<Url> {
    let url = Url::parse(segment).map_err(|e| {
        GatewayError::Configuration(format!("invalid dispatcher URL '{}': {}", segment, e))
    })?;

    if url.scheme() != "http" {
        return Err(GatewayError::Configuration(format!(
            "dispatcher URL '{}' must use http, got '{}'",
            segment,
            url.scheme()
        )));
    }

    if !url.has_host() {
        return Err(GatewayError::Configuration(format!(
            "dispatcher URL '{}' has no host",
            segment
        )));
    }

    Ok(url)
}

impl fmt::Display for DispatcherSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.urls.iter().map(Url::as_str).collect();
        write!(f, "{}", joined.join(","))
    }
}
