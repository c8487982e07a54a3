pub mod common;
pub mod contact;
pub mod engagement;
pub mod organization;
pub mod service;
pub mod tag;
pub mod user;

pub use common::*;
pub use contact::*;
pub use engagement::*;
pub use organization::*;
pub use service::*;
pub use tag::*;
pub use user::*;
