pub mod error;
pub mod http;
pub(crate) mod security;
