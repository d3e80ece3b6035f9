// handlers/mod.rs - HTTP handlers grouped by security tier
//
// public/    - reachable anonymously (pages, health, provider webhooks)
// protected/ - require a signed-in principal; every query is scoped to it

pub mod protected;
pub mod public;
