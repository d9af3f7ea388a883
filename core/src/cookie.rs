//! Cookie engine owned by a transport handle.
//!
//! # Design
//! The jar lives as long as its handle and survives `reset`, which is what
//! makes a `Client` session keep cookies between requests. Cookies are
//! imported and exported as Netscape cookie-file lines, the format curl and
//! browsers use for `cookies.txt`:
//!
//! ```text
//! [#HttpOnly_]domain  TRUE|FALSE  path  TRUE|FALSE  expires  name  value
//! ```
//!
//! separated by tabs, with `expires == 0` for session cookies.

use std::time::{SystemTime, UNIX_EPOCH};

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// A single stored cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Lower-case domain without a leading dot.
    pub domain: String,
    /// Whether subdomains of `domain` also receive the cookie.
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// Expiry as seconds since the Unix epoch; 0 for a session cookie.
    pub expires: u64,
    pub name: String,
    pub value: String,
}

impl Cookie {
    /// Parse one Netscape cookie-file line.
    pub fn from_netscape_line(line: &str) -> Option<Cookie> {
        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None => (line, false),
        };
        if line.starts_with('#') {
            return None;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            return None;
        }
        let domain = fields[0].trim_start_matches('.').to_ascii_lowercase();
        if domain.is_empty() {
            return None;
        }

        Some(Cookie {
            domain,
            include_subdomains: fields[1].eq_ignore_ascii_case("TRUE"),
            path: fields[2].to_string(),
            secure: fields[3].eq_ignore_ascii_case("TRUE"),
            http_only,
            expires: fields[4].parse().ok()?,
            name: fields[5].to_string(),
            value: fields[6].to_string(),
        })
    }

    /// Render as a Netscape cookie-file line.
    pub fn to_netscape_line(&self) -> String {
        format!(
            "{}{}{}\t{}\t{}\t{}\t{}\t{}\t{}",
            if self.http_only { HTTP_ONLY_PREFIX } else { "" },
            if self.include_subdomains { "." } else { "" },
            self.domain,
            bool_field(self.include_subdomains),
            self.path,
            bool_field(self.secure),
            self.expires,
            self.name,
            self.value
        )
    }

    /// Parse a `Set-Cookie` header value.
    ///
    /// `origin` is the host and path of the request that received the
    /// header. Without an origin the cookie must name its own `Domain`.
    /// A cookie whose `Max-Age` or `Expires` already lies in the past is
    /// returned with an expiry of 1 so the jar deletes its stored twin.
    pub fn parse_set_cookie(header: &str, origin: Option<(&str, &str)>, now: u64) -> Option<Cookie> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie {
            domain: String::new(),
            include_subdomains: false,
            path: String::new(),
            secure: false,
            http_only: false,
            expires: 0,
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
        };
        let mut max_age: Option<i64> = None;

        for attr in parts {
            let (key, val) = match attr.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (attr.trim(), ""),
            };
            if key.eq_ignore_ascii_case("domain") {
                let domain = val.trim_start_matches('.').to_ascii_lowercase();
                if !domain.is_empty() {
                    cookie.domain = domain;
                    cookie.include_subdomains = true;
                }
            } else if key.eq_ignore_ascii_case("path") {
                if val.starts_with('/') {
                    cookie.path = val.to_string();
                }
            } else if key.eq_ignore_ascii_case("expires") {
                if let Ok(at) = httpdate::parse_http_date(val) {
                    cookie.expires = unix_seconds(at).max(1);
                }
            } else if key.eq_ignore_ascii_case("max-age") {
                max_age = val.parse().ok();
            } else if key.eq_ignore_ascii_case("secure") {
                cookie.secure = true;
            } else if key.eq_ignore_ascii_case("httponly") {
                cookie.http_only = true;
            }
        }

        if let Some(seconds) = max_age {
            cookie.expires = if seconds <= 0 {
                1
            } else {
                now.saturating_add(seconds as u64)
            };
        }

        match origin {
            Some((host, request_path)) => {
                let host = host.to_ascii_lowercase();
                if cookie.domain.is_empty() {
                    cookie.domain = host;
                } else if !domain_matches(&host, &cookie.domain, true) {
                    tracing::debug!(host = %host, domain = %cookie.domain, "rejected cookie for foreign domain");
                    return None;
                } else if !cookie.domain.contains('.') && cookie.domain != host {
                    // A dotless domain such as `com` would reach every host under it.
                    tracing::debug!(host = %host, domain = %cookie.domain, "rejected cookie for top-level domain");
                    return None;
                }
                if cookie.path.is_empty() {
                    cookie.path = default_path(request_path).to_string();
                }
            }
            None => {
                if cookie.domain.is_empty() {
                    return None;
                }
                if cookie.path.is_empty() {
                    cookie.path = "/".to_string();
                }
            }
        }

        Some(cookie)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expires != 0 && self.expires <= now
    }

    fn matches(&self, host: &str, path: &str, secure: bool, now: u64) -> bool {
        !self.is_expired(now)
            && (secure || !self.secure)
            && domain_matches(host, &self.domain, self.include_subdomains)
            && path_matches(path, &self.path)
    }

    fn same_slot(&self, other: &Cookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

/// Cookie store for one transport handle.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Store `cookie`, replacing any cookie with the same name, domain and
    /// path. An already expired cookie only removes its stored twin.
    pub fn insert(&mut self, cookie: Cookie, now: u64) {
        self.cookies.retain(|c| !c.same_slot(&cookie));
        if cookie.is_expired(now) {
            tracing::trace!(name = %cookie.name, domain = %cookie.domain, "cookie expired, removed");
            return;
        }
        tracing::trace!(name = %cookie.name, domain = %cookie.domain, path = %cookie.path, "cookie stored");
        self.cookies.push(cookie);
    }

    /// Store a `Set-Cookie` header received from `host` for `path`.
    pub fn store_set_cookie(&mut self, header: &str, host: &str, path: &str) {
        let now = unix_now();
        match Cookie::parse_set_cookie(header, Some((host, path)), now) {
            Some(cookie) => self.insert(cookie, now),
            None => tracing::debug!(header = %header, "ignored malformed Set-Cookie"),
        }
    }

    /// Apply one cookie-list command.
    ///
    /// `ALL` clears the jar, `SESS` drops session cookies, `FLUSH` and
    /// `RELOAD` are accepted and do nothing (there is no backing file).
    /// A line starting with `Set-Cookie:` is parsed as that header, anything
    /// else as a Netscape cookie-file line. Unparseable lines are ignored.
    pub fn apply_list_command(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        match line.to_ascii_uppercase().as_str() {
            "ALL" => self.clear(),
            "SESS" => self.clear_session(),
            "FLUSH" | "RELOAD" => {}
            _ => {
                let now = unix_now();
                let parsed = match strip_prefix_ignore_case(line, "set-cookie:") {
                    Some(header) => Cookie::parse_set_cookie(header.trim(), None, now),
                    None => Cookie::from_netscape_line(line),
                };
                match parsed {
                    Some(cookie) => self.insert(cookie, now),
                    None => tracing::debug!(line = %line, "ignored malformed cookie line"),
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Drop every cookie without an expiry.
    pub fn clear_session(&mut self) {
        self.cookies.retain(|c| c.expires != 0);
    }

    /// Value for a `Cookie` request header, or `None` when nothing matches.
    pub fn header_for(&self, host: &str, path: &str, secure: bool) -> Option<String> {
        let now = unix_now();
        let host = host.to_ascii_lowercase();
        let mut matching: Vec<&Cookie> = self
            .cookies
            .iter()
            .filter(|c| c.matches(&host, path, secure, now))
            .collect();
        if matching.is_empty() {
            return None;
        }
        // Stable sort keeps insertion order among equal path lengths.
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        Some(
            matching
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Every live cookie as a Netscape cookie-file line.
    pub fn to_lines(&self) -> Vec<String> {
        let now = unix_now();
        self.cookies
            .iter()
            .filter(|c| !c.is_expired(now))
            .map(Cookie::to_netscape_line)
            .collect()
    }
}

fn bool_field(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &line[prefix.len()..])
}

fn domain_matches(host: &str, domain: &str, include_subdomains: bool) -> bool {
    if host == domain {
        return true;
    }
    include_subdomains
        && host.len() > domain.len()
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path.as_bytes()[cookie_path.len()] == b'/')
}

/// Directory of the request path, per RFC 6265 section 5.1.4.
fn default_path(request_path: &str) -> &str {
    if !request_path.starts_with('/') {
        return "/";
    }
    match request_path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &request_path[..idx],
    }
}

fn unix_seconds(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

pub(crate) fn unix_now() -> u64 {
    unix_seconds(SystemTime::now())
}
