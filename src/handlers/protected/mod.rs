// handlers/protected/mod.rs - Protected handlers (session required)
//
// Route Prefix: /api/todos, /api/subscription, /dashboard, /admin/*
// Middleware: identity resolution + access gate. Handlers take a `Principal`
// and scope every store call to `principal.user_id`.

pub mod pages;
pub mod subscription;
pub mod todos;

pub use pages::{admin_dashboard, dashboard};
pub use subscription::{get as subscription_get, post as subscription_post};
pub use todos::*;
