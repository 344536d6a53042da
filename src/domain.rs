use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

#[derive(Debug)]
pub enum AdmError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    Config(ConfigError),
    InvalidRecord { row: usize, reason: String },
    Logging(String),
}

impl fmt::Display for AdmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmError::IoError(e) => write!(f, "i/o error: {e}"),
            AdmError::PolarsError(e) => write!(f, "could not read data: {e}"),
            AdmError::LoadingFailed(reason) => write!(f, "loading failed: {reason}"),
            AdmError::FileNotFound => write!(f, "file not found"),
            AdmError::PermissionDenied => write!(f, "permission denied"),
            AdmError::UnknownFileType => {
                write!(f, "unknown file type (expected csv, parquet or arrow)")
            }
            AdmError::Config(e) => write!(f, "invalid column configuration: {e}"),
            AdmError::InvalidRecord { row, reason } => write!(f, "row {row}: {reason}"),
            AdmError::Logging(reason) => write!(f, "could not set up logging: {reason}"),
        }
    }
}

impl std::error::Error for AdmError {}

impl From<Error> for AdmError {
    fn from(err: Error) -> Self {
        AdmError::IoError(err)
    }
}

impl From<PolarsError> for AdmError {
    fn from(err: PolarsError) -> Self {
        AdmError::PolarsError(err)
    }
}

impl From<ConfigError> for AdmError {
    fn from(err: ConfigError) -> Self {
        AdmError::Config(err)
    }
}

/// Problems with a page's column configuration, caught when the columns are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    NoColumns,
    DuplicateColumn(&'static str),
    /// A nested field was configured with raw comparison instead of an explicit comparator.
    NonPrimitiveSortField(&'static str),
    DefaultSortNotSortable(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoColumns => write!(f, "no columns configured"),
            ConfigError::DuplicateColumn(name) => write!(f, "column `{name}` configured twice"),
            ConfigError::NonPrimitiveSortField(name) => write!(
                f,
                "column `{name}` holds nested values and needs an explicit comparator"
            ),
            ConfigError::DefaultSortNotSortable(name) => {
                write!(f, "default sort field `{name}` is not a sortable column")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Exit,
    Enter,
    Help,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Search,
    ColumnMenu,
    SortAscending,
    SortDescending,
    FocusFilter,
    ClearFilter,
    ResetView,
    CopyRow,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

/// Which text line currently receives raw key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Search,
    Filter,
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct AppConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 32,
            log_file: std::env::temp_dir().join("admtable.log"),
        }
    }
}

pub const HELP_TEXT: &str = "\
Navigation
  ←↓↑→ / hjkl     move the selection
  PgUp / PgDn     move a page
  g / G           first / last row

List
  /               search all fields
  f               open the column menu for the selected column
  r               reset search and filters
  c               copy the selected row
  ?               this help
  q               quit

Column menu
  a / d           sort ascending / descending
  i               edit the column filter (Enter or Esc to stop editing)
  x               clear the column filter
  Esc             close the menu
";
