use std::collections::BTreeSet;

use crate::codec::ParamCodec;
use crate::error::UrlStateError;
use crate::port::UrlPort;
use crate::query::QueryParams;

/// One value bound to one query parameter.
///
/// Writes go through `replace_search`, never a push, and only when the value
/// actually changed under the codec's equality. Reads from the URL only
/// overwrite local state when the hydrated value differs, so a write followed
/// by a re-read of the same URL is a no-op.
#[derive(Debug)]
pub struct UrlStore<C: ParamCodec> {
    key: String,
    codec: C,
    value: C::Value,
    dirty: bool,
}

impl<C: ParamCodec> UrlStore<C> {
    pub fn new(key: impl Into<String>, codec: C) -> Self {
        let value = codec.initial();
        Self {
            key: key.into(),
            codec,
            value,
            dirty: false,
        }
    }

    /// Builds the store and hydrates it from the current URL.
    pub fn hydrated<P: UrlPort + ?Sized>(key: impl Into<String>, codec: C, port: &P) -> Self {
        let mut store = Self::new(key, codec);
        store.sync_from_url(port);
        store
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn get(&self) -> &C::Value {
        &self.value
    }

    /// `true` when a staged value has not been written yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Updates the in-memory value only. Returns `true` if it changed.
    ///
    /// Used while a gesture (drag, slider scrub) is in flight; call
    /// [`UrlStore::flush`] once the gesture settles.
    pub fn stage(&mut self, next: C::Value) -> bool {
        if self.codec.are_equal(&self.value, &next) {
            return false;
        }
        self.value = next;
        self.dirty = true;
        true
    }

    /// Writes a staged value to the URL. Returns `true` if the URL changed.
    pub fn flush<P: UrlPort + ?Sized>(&mut self, port: &mut P) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        let serialized = self.codec.dehydrate(&self.value);
        write_param(port, &self.key, &serialized)
    }

    /// Applies a staged value to `params` instead of the URL, so several
    /// stores can share one history write. Returns `true` if `params` changed.
    pub fn flush_into(&mut self, params: &mut QueryParams) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        apply_param(params, &self.key, &self.codec.dehydrate(&self.value))
    }

    /// Stage and flush in one step. Returns `true` if the URL changed.
    pub fn set<P: UrlPort + ?Sized>(&mut self, next: C::Value, port: &mut P) -> bool {
        self.stage(next);
        self.flush(port)
    }

    /// Re-reads the parameter after an external URL change.
    ///
    /// Returns `true` if local state was overwritten.
    pub fn sync_from_url<P: UrlPort + ?Sized>(&mut self, port: &P) -> bool {
        let params = QueryParams::parse(&port.search());
        let from_url = self.codec.hydrate(params.get(&self.key));
        let next = self.codec.reconcile(from_url, &self.value);
        self.dirty = false;
        if self.codec.are_equal(&self.value, &next) {
            return false;
        }
        self.value = next;
        true
    }

    /// Strict read for tooling: `Ok(None)` when absent, an error when present
    /// but unparseable.
    pub fn try_read(&self, params: &QueryParams) -> Result<Option<C::Value>, UrlStateError> {
        let Some(raw) = params.get(&self.key).map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(None);
        };
        self.codec
            .try_hydrate(raw)
            .map(Some)
            .map_err(|reason| UrlStateError::Malformed {
                key: self.key.clone(),
                reason,
            })
    }

    /// The text this store would write for its current value; empty when the
    /// parameter is omitted.
    pub fn serialized(&self) -> String {
        self.codec.dehydrate(&self.value)
    }
}

/// Writes or removes `key`, leaving every other parameter untouched.
///
/// Returns `false` without touching history when the query string would not
/// change.
pub fn write_param<P: UrlPort + ?Sized>(port: &mut P, key: &str, serialized: &str) -> bool {
    let mut params = QueryParams::parse(&port.search());
    apply_param(&mut params, key, serialized);
    replace_query(port, &params)
}

/// Replaces the whole query string with `params` when it differs from the
/// current one. Returns `true` if history was written.
pub fn replace_query<P: UrlPort + ?Sized>(port: &mut P, params: &QueryParams) -> bool {
    let next = params.to_query_string();
    if next == port.search() {
        return false;
    }
    tracing::debug!(query = %next, "url.replace");
    port.replace_search(&next);
    true
}

fn apply_param(params: &mut QueryParams, key: &str, serialized: &str) -> bool {
    if serialized.is_empty() {
        params.remove(key)
    } else if params.get(key) == Some(serialized) {
        false
    } else {
        params.set(key, serialized);
        true
    }
}

/// Guards against two stores binding the same parameter within one session.
#[derive(Debug, Default)]
pub struct ParamKeys {
    keys: BTreeSet<String>,
}

impl ParamKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, key: &str) -> Result<(), UrlStateError> {
        if !self.keys.insert(key.to_string()) {
            return Err(UrlStateError::DuplicateParam(key.to_string()));
        }
        Ok(())
    }

    /// Claims `key` and builds its store. Every store of a session is built
    /// through here.
    pub fn bind<C: ParamCodec>(&mut self, key: &str, codec: C) -> Result<UrlStore<C>, UrlStateError> {
        self.claim(key)?;
        Ok(UrlStore::new(key, codec))
    }
}
