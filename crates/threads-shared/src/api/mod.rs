mod communities;
mod events;
mod paging;
mod threads;
mod users;

pub use communities::*;
pub use events::*;
pub use paging::*;
pub use threads::*;
pub use users::*;
