pub mod ask;
pub mod documents;
pub(crate) mod health;
pub mod imports;
pub mod search;

pub use health::health_check;
