// handlers/public/mod.rs - Public handlers (no session required)
//
// Route Prefix: none for pages and /health, /api/webhooks/* for provider events
// Middleware: identity resolution only; the access gate lets these through.
// Webhook requests are authenticated by their signature instead.

pub mod health;
pub mod pages;
pub mod webhooks;

pub use health::get as health_get;
pub use pages::{error_page, home, sign_in, sign_up};
pub use webhooks::register as webhook_register;
