// handlers/public/auth/mod.rs - Public authentication handlers
//
// Registration and token endpoints. None of them require a bearer token.

pub mod email;    // POST /resend-verification-email, POST /password-reset
pub mod login;    // POST /login - exchange credentials for tokens
pub mod logout;   // POST /logout - end the session
pub mod refresh;  // POST /refresh-token - renew the token pair
pub mod register; // POST /register - employee registration
pub mod utils;

pub use email::{password_reset_post, resend_verification_post};
pub use login::login_post;
pub use logout::logout_post;
pub use refresh::refresh_post;
pub use register::register_post;
