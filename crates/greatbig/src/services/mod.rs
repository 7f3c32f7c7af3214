pub mod config;
pub mod entity;
pub mod types;

pub use config::ConfigService;
pub use entity::{EntityService, Saved};
pub use types::{
    AppConfig, AuthConfig, Direction, Page, Pageable, PaginationConfig, SearchConfig,
    ServerConfig, Sort, StorageConfig,
};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("A new {entity} cannot already have an ID")]
    IdExists { entity: &'static str },

    #[error("Cannot sort {entity} by unknown property '{property}'")]
    InvalidSort {
        entity: &'static str,
        property: String,
    },

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}
