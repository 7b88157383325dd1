//! Binding of typed application values to URL query parameters.
//!
//! A [`UrlStore`] owns one value and knows how to read and write it through a
//! [`UrlPort`] (the address bar, or [`MemoryLocation`] in tests and tools).
//! Each value type brings a [`ParamCodec`] that decides its text form.

pub mod codec;
pub mod error;
pub mod kv;
pub mod port;
pub mod query;
pub mod store;

pub use codec::*;
pub use error::*;
pub use kv::*;
pub use port::*;
pub use query::*;
pub use store::*;
