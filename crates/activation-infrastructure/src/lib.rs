pub mod config_service;
pub mod dto;
pub mod http_client;
pub mod mapper;
pub mod paths;
pub mod progress_cache;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::http_client::HttpActivationClient;
pub use crate::mapper::StepDataMapper;
pub use crate::progress_cache::{CacheLoad, CacheWrite, ProgressCache};
pub use crate::storage::{FileKeyValueStore, MemoryKeyValueStore};
