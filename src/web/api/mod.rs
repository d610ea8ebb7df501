pub mod error;
pub mod radar;
