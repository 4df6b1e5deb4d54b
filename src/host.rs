use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Scheme used for hosts listed without one
pub const DEFAULT_SCHEME: &str = "https://";

/// Path of the health-status endpoint on every host
pub const STATUS_PATH: &str = "/healthz";

/// The status endpoint of a single host in the fleet.
///
/// Construct it with [`HostAddress::normalize`], which turns a raw line from
/// the host list into a URL that can be handed to a
/// [`StatusFetcher`](crate::StatusFetcher).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostAddress(String);

impl HostAddress {
    /// Normalize a raw host identifier.
    ///
    /// A missing `http://` or `https://` scheme is replaced by
    /// [`DEFAULT_SCHEME`] and [`STATUS_PATH`] is appended unless the address
    /// already ends with it. Normalizing an already normalized address returns
    /// it unchanged.
    ///
    /// ```
    /// use fleet_health::HostAddress;
    ///
    /// let host = HostAddress::normalize("server-0001.example.org");
    /// assert_eq!(host.as_str(), "https://server-0001.example.org/healthz");
    /// assert_eq!(HostAddress::normalize(host.as_str()), host);
    /// ```
    pub fn normalize(raw: &str) -> Self {
        let (scheme, rest) = split_scheme(raw);
        // Only the part after the scheme is trimmed, `https://` keeps its slashes
        let rest = rest.trim_end_matches('/');
        let address = if rest.ends_with(STATUS_PATH) {
            format!("{}{}", scheme, rest)
        } else {
            format!("{}{}{}", scheme, rest, STATUS_PATH)
        };
        HostAddress(address)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

fn split_scheme(raw: &str) -> (&str, &str) {
    for scheme in &["http://", "https://"] {
        if let Some(rest) = raw.strip_prefix(scheme) {
            return (*scheme, rest);
        }
    }
    (DEFAULT_SCHEME, raw)
}

impl Display for HostAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
