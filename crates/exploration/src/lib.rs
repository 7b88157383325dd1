//! Exploration session: one owner for the dataset timeline, the AOI, the
//! view parameters and their URL bindings.

pub mod analysis;
pub mod config;
pub mod error;
pub mod map;
pub mod params;
pub mod permalink;
pub mod session;
pub mod view;

pub use analysis::*;
pub use config::*;
pub use error::*;
pub use map::*;
pub use params::*;
pub use permalink::*;
pub use session::*;
pub use view::*;
