pub mod config_service;
pub mod dto;
pub mod memory_chat_repository;
pub mod paths;
pub mod storage;
pub mod toml_chat_repository;

pub use crate::config_service::ConfigService;
pub use crate::memory_chat_repository::InMemoryChatRepository;
pub use crate::paths::MurmurPaths;
pub use crate::toml_chat_repository::TomlChatRepository;
