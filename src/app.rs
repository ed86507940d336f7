use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::config::{Backend, Config, ConfigError};
use crate::domain::measure::MatrixSummary;
use crate::domain::presets::size_dimensions;
use crate::domain::{Bay, Cell, Level, Matrix, StackItem};
use crate::engine::{Reconciler, SaveOptions};
use crate::error::SyncError;
use crate::gateway::{HttpGateway, LocalGateway, MatrixGateway};
use crate::normalize::{normalize_items, normalize_matrix};
use crate::reorder::cell_identity;
use crate::store::{JsonFileStore, MatrixStore, SqliteStore, StoreError};

pub struct App {
    engine: Reconciler<Box<dyn MatrixGateway>>,
}

/// Field values of a single bundle entered on the command line.
#[derive(Debug, Clone, Default)]
pub struct ItemInput {
    pub size: String,
    pub length_mm: u32,
    pub pieces: u32,
    pub grade: Option<String>,
    pub treatment: Option<String>,
    pub bundle_id: Option<String>,
    pub note: Option<String>,
}

impl App {
    /// Builds the gateway for the configured backend and performs the
    /// initial load. A failed load is reported here rather than left sticky.
    pub fn open(config: Config) -> Result<Self, AppError> {
        let gateway = open_gateway(&config)?;
        let engine = Reconciler::new(gateway, config.actor.clone());
        engine.load_matrix();
        if let Some(message) = engine.status().error {
            return Err(AppError::LoadFailed(message));
        }
        Ok(Self { engine })
    }

    pub fn matrix(&self) -> Arc<Matrix> {
        self.engine.matrix()
    }

    pub fn cell(&self, bay: &str, level: &str) -> Result<Cell, AppError> {
        let bay: Bay = bay.parse().map_err(SyncError::from)?;
        let level: Level = level.parse().map_err(SyncError::from)?;
        self.engine
            .matrix()
            .cell(bay, level)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("{bay}/{level}")))
    }

    pub fn save(
        &self,
        bay: &str,
        level: &str,
        items: Vec<StackItem>,
        move_to_top: bool,
    ) -> Result<Arc<Matrix>, AppError> {
        if !items.iter().any(|item| item.pieces > 0) {
            return Err(AppError::InvalidArgument(
                "at least one item needs a positive piece count".to_string(),
            ));
        }
        Ok(self
            .engine
            .save_cell(bay, level, items, SaveOptions { move_to_top })?)
    }

    pub fn clear(&self, bay: &str, level: &str) -> Result<Arc<Matrix>, AppError> {
        Ok(self.engine.clear_cell(bay, level)?)
    }

    /// Each entry is a cell identity or the level code of a currently
    /// occupied cell in `bay`.
    pub fn reorder(&self, bay: &str, entries: &[String]) -> Result<Arc<Matrix>, AppError> {
        let parsed: Bay = bay.parse().map_err(SyncError::from)?;
        let current = self.engine.matrix();
        let column = current.column(parsed);
        let identities = entries
            .iter()
            .map(|entry| match Level::from_code(&entry.trim().to_ascii_uppercase()) {
                Some(level) => column.get(level).map(cell_identity).ok_or_else(|| {
                    AppError::InvalidArgument(format!("{parsed}/{level} is empty"))
                }),
                None => Ok(entry.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.engine.reorder_bay(bay, &identities)?)
    }

    pub fn import(&self, path: &Path) -> Result<Arc<Matrix>, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&raw)?;
        if !value.is_object() {
            return Err(AppError::InvalidArgument(
                "import file must contain a JSON object of bays".to_string(),
            ));
        }
        Ok(self.engine.replace_matrix(normalize_matrix(&value))?)
    }

    pub fn summary(&self) -> MatrixSummary {
        MatrixSummary::of(&self.engine.matrix())
    }
}

pub fn open_store(config: &Config) -> Result<Box<dyn MatrixStore>, AppError> {
    match config.backend {
        Backend::Json => Ok(Box::new(JsonFileStore::new(&config.store_path))),
        Backend::Sqlite => Ok(Box::new(SqliteStore::open(
            &config.store_path,
            &config.area_id,
        )?)),
        Backend::Http => Err(AppError::InvalidArgument(
            "the http backend has no local store; choose json or sqlite".to_string(),
        )),
    }
}

pub fn open_gateway(config: &Config) -> Result<Box<dyn MatrixGateway>, AppError> {
    tracing::debug!(backend = %config.backend, "opening matrix gateway");
    match config.backend {
        Backend::Http => Ok(Box::new(HttpGateway::new(&config.api_url, config.timeout)?)),
        Backend::Json | Backend::Sqlite => Ok(Box::new(LocalGateway::new(open_store(config)?))),
    }
}

/// Accepts a JSON array of item objects, leniently normalized.
pub fn parse_items(raw: &str) -> Result<Vec<StackItem>, AppError> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_array() {
        return Err(AppError::InvalidArgument(
            "--items must be a JSON array of item objects".to_string(),
        ));
    }
    Ok(normalize_items(&value))
}

pub fn build_item(input: ItemInput) -> Result<StackItem, AppError> {
    let dimensions = size_dimensions(&input.size).ok_or_else(|| {
        AppError::InvalidArgument(format!(
            "invalid size '{}': expected <thickness>x<width>, e.g. 45x90",
            input.size
        ))
    })?;
    if input.length_mm == 0 {
        return Err(AppError::InvalidArgument(
            "length must be positive".to_string(),
        ));
    }
    let mut item = StackItem::new(
        input.size.trim().to_ascii_lowercase(),
        dimensions.width_mm,
        dimensions.thickness_mm,
        input.length_mm,
        input.pieces,
    );
    item.grade = non_empty(input.grade);
    item.treatment = non_empty(input.treatment);
    item.bundle_id = non_empty(input.bundle_id);
    item.notes = non_empty(input.note);
    Ok(item)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Config(ConfigError),
    Store(StoreError),
    Sync(SyncError),
    Json(serde_json::Error),
    LoadFailed(String),
    InvalidArgument(String),
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Config(err) => write!(f, "{}", err),
            AppError::Store(err) => write!(f, "{}", err),
            AppError::Sync(err) => write!(f, "{}", err),
            AppError::Json(err) => write!(f, "JSON error: {}", err),
            AppError::LoadFailed(message) => write!(f, "failed to load matrix: {}", message),
            AppError::InvalidArgument(message) => write!(f, "invalid argument: {}", message),
            AppError::NotFound(coordinate) => write!(f, "no cell at {}", coordinate),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Sync(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::LoadFailed(_) => None,
            AppError::InvalidArgument(_) => None,
            AppError::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::Store(value)
    }
}

impl From<SyncError> for AppError {
    fn from(value: SyncError) -> Self {
        AppError::Sync(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Json(value)
    }
}
