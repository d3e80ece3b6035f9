//! Authorization and plan rules shared by the gate middleware, the handlers
//! and every store backend. Nothing in here touches I/O.

pub mod access;
pub mod quota;
pub mod subscription;

pub use access::{classify, evaluate, GateDecision, RouteClass};
pub use quota::{QuotaExceeded, TodoQuota};
pub use subscription::SubscriptionState;
