pub mod todo;
pub mod user;

pub use todo::{Todo, TodoPatch, TodoValidationError};
pub use user::{NewUser, User};
