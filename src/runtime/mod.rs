pub mod storage;
pub mod redis_storage;
pub mod store;
