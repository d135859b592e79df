//! icaljson Core Library
//!
//! This library converts iCalendar text into an ordered property tree and
//! back, and builds a flat event view on top of that tree.

pub mod codec;
pub mod error;
pub mod model;
pub mod view;

// Re-export core types and error handling
pub use codec::{decode, encode, encode_with};
pub use error::{Error, Result};
pub use model::{IcalNode, IcalValue};

/// Commonly used items
pub mod prelude {
    pub use crate::{codec::*, model::*, view::*};
}
