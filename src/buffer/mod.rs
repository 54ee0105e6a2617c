mod buffer_pool;
mod lru_cache;

pub use buffer_pool::*;
pub use lru_cache::*;
