pub mod blog;
pub mod comment;
pub mod like;
pub mod user;

pub use blog::{BlogPost, NewBlogPost, PostChanges};
pub use comment::{Comment, CommentChanges, NewComment};
pub use like::{Like, LikeToggle, NewLike};
pub use user::{NewUser, User, UserChanges};
