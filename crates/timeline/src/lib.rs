pub mod cursor;
pub mod dataset;
pub mod error;
pub mod registry;
pub mod timeline;

pub use cursor::*;
pub use dataset::*;
pub use error::*;
pub use registry::*;
pub use timeline::*;
