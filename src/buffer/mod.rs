pub mod buffer_pool;
pub mod mru;

pub use buffer_pool::{BufferPool, DEFAULT_PAGES, DEFAULT_PAGE_SIZE};
pub use mru::Mru;
