pub mod collection;
pub mod record;

pub use collection::get as todos_get;
pub use collection::post as todos_post;

pub use record::delete as todo_delete;
pub use record::get as todo_get;
pub use record::put as todo_put;

