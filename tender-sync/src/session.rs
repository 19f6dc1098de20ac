//! Sticky-session cookie handling.
//!
//! The upstream is fronted by a load balancer that routes a client to one
//! backend via the `AWSELB` and `SERVER_ID` cookies. Both retrievers of one
//! generation must share the exact same cookie state (invariant I2); this
//! module is a small hand-rolled [`reqwest::cookie::CookieStore`] rather
//! than `reqwest::cookie::Jar` because the `ResourceNotFound` recovery path
//! (§4.2) needs to explicitly clear cookies, which `Jar` does not expose.

use parking_lot::RwLock;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

const AWS_ELB: &str = "AWSELB";
const SERVER_ID: &str = "SERVER_ID";

#[derive(Debug, Default)]
struct JarState {
    cookies: HashMap<String, String>,
}

/// The sticky-session cookie store, shared by reference between both
/// retrievers of one generation (I2).
#[derive(Debug, Default)]
pub struct StickyJar(RwLock<JarState>);

impl StickyJar {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Clear all cookies, used after a `ResourceNotFound` response.
    pub fn clear(&self) {
        self.0.write().cookies.clear();
    }

    fn get(&self, name: &str) -> Option<String> {
        self.0.read().cookies.get(name).cloned()
    }
}

impl CookieStore for StickyJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, _url: &Url) {
        let mut state = self.0.write();
        for header in cookie_headers {
            let Ok(raw) = header.to_str() else { continue };
            let Some((name, rest)) = raw.split_once('=') else {
                continue;
            };
            let value = rest.split(';').next().unwrap_or("").to_string();
            state.cookies.insert(name.trim().to_string(), value);
        }
    }

    fn cookies(&self, _url: &Url) -> Option<HeaderValue> {
        let state = self.0.read();
        if state.cookies.is_empty() {
            return None;
        }
        let joined = state
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }
}

/// A snapshot of the two sticky cookies, used to detect session divergence
/// between the two retrievers of a generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StickyCookies {
    pub aws_elb: Option<String>,
    pub server_id: Option<String>,
}

/// A handle to the shared cookie jar plus the base URL cookies are scoped
/// to. Cloning a [`Session`] shares the same underlying jar (`Arc`).
#[derive(Debug, Clone)]
pub struct Session {
    jar: Arc<StickyJar>,
    base_url: Url,
}

impl Session {
    pub fn new(base_url: Url) -> Self {
        Self {
            jar: StickyJar::new(),
            base_url,
        }
    }

    /// Build a new [`Session`] that shares the same jar by reference (I2).
    pub fn share(&self) -> Self {
        Self {
            jar: self.jar.clone(),
            base_url: self.base_url.clone(),
        }
    }

    pub fn cookie_provider(&self) -> Arc<dyn CookieStore> {
        self.jar.clone() as Arc<dyn CookieStore>
    }

    pub fn clear(&self) {
        self.jar.clear();
    }

    pub fn snapshot(&self) -> StickyCookies {
        StickyCookies {
            aws_elb: self.jar.get(AWS_ELB),
            server_id: self.jar.get(SERVER_ID),
        }
    }
}

/// Invariant I2: the snapshot a retriever observes on its working session
/// must match the snapshot of the canonical session handed out at spawn
/// time.
///
/// `Supervisor` always builds both `local` and `canonical` via
/// [`Session::share`] off one `Arc<StickyJar>`, so in the running system
/// this compares the same underlying state to itself and can never
/// observe a mismatch — it is a structural assertion, not a live check. It
/// only becomes a meaningful guard if a retriever is ever constructed from
/// an independently-created `Session` rather than a shared one.
pub fn check_affinity(local: &Session, canonical: &Session) -> bool {
    local.snapshot() == canonical.snapshot()
}
