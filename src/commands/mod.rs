pub mod oauth_check;
