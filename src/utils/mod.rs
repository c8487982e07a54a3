// Utility functions
pub mod dates;
pub mod error;
pub mod list;
pub mod text;

pub use dates::*;
pub use error::*;
pub use list::*;
pub use text::*;
