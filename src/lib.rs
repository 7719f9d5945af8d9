pub mod api;
pub mod contracts;
pub mod ranking;
pub mod storage;
