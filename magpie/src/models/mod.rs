mod common;
mod document;
mod search;
mod section;
mod session;
mod token;

pub use common::*;
pub use document::*;
pub use search::*;
pub use section::*;
pub use session::*;
pub use token::*;
