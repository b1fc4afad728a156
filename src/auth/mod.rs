//! Access control: the shared log-in code, session cookies and log-in rate limiting.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod rate_limit;
mod token;

pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use log_in::post_log_in;
pub use log_out::get_log_out;
pub use middleware::auth_guard;
pub use rate_limit::{RateLimiter, WindowedRateLimiter};

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
