pub mod page_cache;

pub use page_cache::{CachedPage, PageCache, PageCacheStats};
