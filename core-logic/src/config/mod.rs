use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Parses the `ip:port` / `ip:port:username:password` shorthand.
    ///
    /// Returns `None` for blank lines, `#` comments and lines with fewer than
    /// two parts. A value that already carries a scheme is taken as a URL.
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        if line.contains("://") {
            return Some(Self {
                url: line.to_string(),
                username: None,
                password: None,
            });
        }

        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() < 2 {
            return None;
        }

        let (username, password) = if parts.len() >= 4 {
            (Some(parts[2].to_string()), Some(parts[3].to_string()))
        } else {
            (None, None)
        };

        Some(Self {
            url: format!("http://{}:{}", parts[0], parts[1]),
            username,
            password,
        })
    }
}
