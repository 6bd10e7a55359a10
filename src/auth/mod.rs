pub mod cleanup;
pub mod magic_link;
pub mod mail;
pub mod middleware;
pub mod session;
pub mod username;

pub use magic_link::{
    hash_token, home_path, issue_magic_link, normalize_email, redeem_magic_link, MagicLinkRequest,
    SignIn,
};
pub use mail::{sender_from_config, LogSender, MagicLinkSender, WebhookSender};
pub use middleware::{MaybeUser, RequireAdmin, RequireStudent, RequireTeacher, RequireUser};
pub use session::{
    clear_session_cookie, generate_session_token, session_cookie, session_token_from_headers,
};
pub use username::generate_unique_username;
