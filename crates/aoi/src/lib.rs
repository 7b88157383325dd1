//! Area-of-interest state: the polygon(s) a user draws or picks to scope
//! analysis, and the state machine that turns draw gestures into it.

pub mod codec;
pub mod controller;
pub mod error;
pub mod event;
pub mod feature;
pub mod measure;

pub use codec::*;
pub use controller::*;
pub use error::*;
pub use event::*;
pub use feature::*;
pub use measure::*;
