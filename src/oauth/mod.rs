//! Usage: Authorization code flow pieces (request, browser hand-off, callback, token exchange).

pub mod authorize;
pub mod await_callback;
pub mod browser;
pub mod callback_server;
pub mod token_exchange;
