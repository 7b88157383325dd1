/// Capability over the address bar: read the current query string and replace
/// it without creating a new history entry.
pub trait UrlPort {
    /// Current query string without the leading `?`.
    fn search(&self) -> String;

    /// Replaces the current history entry's query string. Never pushes.
    fn replace_search(&mut self, search: &str);
}

/// In-memory location used by tests and tools.
///
/// Counts `replace_search` calls so callers can assert how many history
/// writes a gesture produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryLocation {
    search: String,
    replace_count: u64,
}

impl MemoryLocation {
    pub fn new(search: impl Into<String>) -> Self {
        let search = search.into();
        let search = search.strip_prefix('?').unwrap_or(&search).to_string();
        Self {
            search,
            replace_count: 0,
        }
    }

    pub fn replace_count(&self) -> u64 {
        self.replace_count
    }

    /// Simulates back/forward navigation: the query changes without a write
    /// from the application.
    pub fn navigate(&mut self, search: impl Into<String>) {
        let search = search.into();
        self.search = search.strip_prefix('?').unwrap_or(&search).to_string();
    }
}

impl UrlPort for MemoryLocation {
    fn search(&self) -> String {
        self.search.clone()
    }

    fn replace_search(&mut self, search: &str) {
        self.search = search.to_string();
        self.replace_count += 1;
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::UrlPort;
    use crate::error::UrlStateError;

    /// `window.location` for reads, `history.replaceState` for writes.
    #[derive(Debug)]
    pub struct BrowserLocation {
        window: web_sys::Window,
    }

    impl BrowserLocation {
        pub fn new() -> Result<Self, UrlStateError> {
            let window = web_sys::window().ok_or(UrlStateError::BrowserUnavailable)?;
            Ok(Self { window })
        }
    }

    impl UrlPort for BrowserLocation {
        fn search(&self) -> String {
            let raw = self.window.location().search().unwrap_or_default();
            raw.strip_prefix('?').unwrap_or(&raw).to_string()
        }

        fn replace_search(&mut self, search: &str) {
            let location = self.window.location();
            let hash = location.hash().unwrap_or_default();
            let url = if search.is_empty() {
                format!("{}{hash}", location.pathname().unwrap_or_default())
            } else {
                format!("?{search}{hash}")
            };
            let Ok(history) = self.window.history() else {
                tracing::warn!("history api unavailable; url not updated");
                return;
            };
            if let Err(err) =
                history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&url))
            {
                tracing::warn!("replaceState failed: {err:?}");
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserLocation;
