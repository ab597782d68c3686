pub mod auth_handler;

pub use auth_handler::{
    __path_get_guest_token, __path_get_user_info, __path_refresh_token, get_guest_token,
    get_user_info, refresh_token, AuthState,
};
