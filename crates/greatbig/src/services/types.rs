use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(anyhow::anyhow!("Invalid sort direction: {}", s)),
        }
    }
}

/// Sort order on a single property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub property: String,
    pub direction: Direction,
}

impl Sort {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
        }
    }
}

impl std::str::FromStr for Sort {
    type Err = anyhow::Error;

    /// Parses `property` or `property,asc|desc`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (property, direction) = match s.split_once(',') {
            Some((property, direction)) => (property.trim(), direction.trim().parse()?),
            None => (s.trim(), Direction::Asc),
        };
        if property.is_empty() {
            return Err(anyhow::anyhow!("Sort property must not be empty"));
        }
        Ok(Self {
            property: property.to_string(),
            direction,
        })
    }
}

/// Page request: zero-based page index, page size and optional sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pageable {
    pub page: u64,
    pub size: u64,
    pub sort: Option<Sort>,
}

impl Pageable {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size,
            sort: None,
        }
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

impl Default for Pageable {
    fn default() -> Self {
        Self::new(0, PaginationConfig::default().default_size)
    }
}

/// One page of results together with the total number of matching records
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u64,
    pub size: u64,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: u64) -> Self {
        Self {
            content,
            number: pageable.page,
            size: pageable.size,
            total_elements,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            1
        } else {
            self.total_elements.div_ceil(self.size)
        }
    }

    pub fn has_next(&self) -> bool {
        self.number.saturating_add(1) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Relational store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".greatbig/greatbig.db"),
            max_connections: 5,
        }
    }
}

/// Search index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// LanceDB URI: local path or s3://bucket/path
    pub uri: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            uri: ".greatbig/search.lance".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_size: u64,
    pub max_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 2000,
        }
    }
}

impl PaginationConfig {
    /// Build a page request from raw query values, applying the default size
    /// for missing or zero sizes and clamping to the maximum.
    pub fn pageable(&self, page: Option<u64>, size: Option<u64>) -> Pageable {
        let size = match size {
            Some(0) | None => self.default_size,
            Some(size) => size.min(self.max_size),
        };
        Pageable::new(page.unwrap_or(0), size.max(1))
    }
}

/// API keys. Authentication is disabled when both lists are empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub read_only_keys: Vec<String>,
    #[serde(default)]
    pub read_write_keys: Vec<String>,
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}
