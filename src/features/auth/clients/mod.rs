mod oauth_client;

pub use oauth_client::*;
