pub mod comments;
pub mod health;

pub use comments::{add_comment, delete_comment, list_comments, update_comment};
pub use health::health_check;
