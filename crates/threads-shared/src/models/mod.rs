mod community;
mod thread;
mod user;

pub use community::*;
pub use thread::*;
pub use user::*;
