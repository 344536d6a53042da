//! Where list pages get their records from.
//!
//! Staff exports are read with polars. Every column is cast to strings while
//! loading and each record kind parses the typed fields it needs from a
//! [`RawRow`].

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::domain::AdmError;
use crate::record::ListRecord;

/// Anything that can hand over the complete, finite record set of a page.
pub trait RecordSource<R> {
    fn fetch_all(&self) -> Result<Vec<R>, AdmError>;
}

/// Records that are already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource<R> {
    records: Vec<R>,
}

impl<R> MemorySource<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self { records }
    }
}

impl<R: Clone> RecordSource<R> for MemorySource<R> {
    fn fetch_all(&self) -> Result<Vec<R>, AdmError> {
        Ok(self.records.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileType {
    Csv,
    Parquet,
    Arrow,
}

#[derive(Debug)]
pub struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// One column of a loaded export, every cell in its string form.
#[derive(Debug, Clone)]
pub struct LoadedColumn {
    pub name: String,
    pub data: Vec<Option<String>>,
}

/// Read access to one row of a loaded export by column name.
pub struct RawRow<'a> {
    columns: &'a [LoadedColumn],
    lookup: &'a HashMap<String, usize>,
    row: usize,
}

impl<'a> RawRow<'a> {
    pub fn new(columns: &'a [LoadedColumn], lookup: &'a HashMap<String, usize>, row: usize) -> Self {
        Self {
            columns,
            lookup,
            row,
        }
    }

    /// Zero based row number within the export.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Cell text; `None` for absent columns, nulls and blank cells.
    pub fn text(&self, column: &str) -> Option<&'a str> {
        let idx = *self.lookup.get(column)?;
        self.columns[idx].data[self.row]
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn invalid(&self, reason: impl Into<String>) -> AdmError {
        AdmError::InvalidRecord {
            row: self.row + 1,
            reason: reason.into(),
        }
    }

    pub fn string(&self, column: &str) -> Option<String> {
        self.text(column).map(str::to_string)
    }

    pub fn required(&self, column: &str) -> Result<String, AdmError> {
        self.string(column)
            .ok_or_else(|| self.invalid(format!("missing value for `{column}`")))
    }

    pub fn int(&self, column: &str) -> Result<Option<i64>, AdmError> {
        self.text(column)
            .map(|s| {
                s.parse::<i64>()
                    .map_err(|_| self.invalid(format!("`{column}`: `{s}` is not a whole number")))
            })
            .transpose()
    }

    pub fn float(&self, column: &str) -> Result<Option<f64>, AdmError> {
        self.text(column)
            .map(|s| {
                s.parse::<f64>()
                    .map_err(|_| self.invalid(format!("`{column}`: `{s}` is not a number")))
            })
            .transpose()
    }

    pub fn flag(&self, column: &str) -> Result<Option<bool>, AdmError> {
        self.text(column)
            .map(|s| match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Ok(true),
                "false" | "no" | "n" | "0" => Ok(false),
                _ => Err(self.invalid(format!("`{column}`: `{s}` is not yes/no"))),
            })
            .transpose()
    }
}

/// A local export file (csv, parquet or arrow ipc).
#[derive(Debug)]
pub struct FileSource {
    info: FileInfo,
}

impl FileSource {
    pub fn open(path: PathBuf) -> Result<Self, AdmError> {
        Ok(Self {
            info: Self::get_file_info(path)?,
        })
    }

    pub fn name(&self) -> String {
        self.info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string()
    }

    /// Load every column as strings, one rayon task per column.
    #[instrument(skip(self), fields(path = %self.info.path.display(), bytes = self.info.file_size))]
    pub fn load_columns(&self) -> Result<Vec<LoadedColumn>, AdmError> {
        // The export may have been moved since `open`
        fs::metadata(&self.info.path).map_err(Self::io_error)?;
        let frame = match self.info.file_type {
            FileType::Csv => Self::load_csv(&self.info.path),
            FileType::Parquet => Self::load_parquet(&self.info.path),
            FileType::Arrow => Self::load_arrow(&self.info.path),
        }
        .map_err(Self::polars_error)?;

        let start_time = Instant::now();
        let df = Arc::new(frame.collect().map_err(Self::polars_error)?);
        let columns: Result<Vec<LoadedColumn>, PolarsError> = df
            .get_column_names()
            .par_iter()
            .map(|name| Self::load_column(&df, name.as_str()))
            .collect();
        let columns = columns?;

        info!(
            "Loading {} columns took {}ms ...",
            columns.len(),
            start_time.elapsed().as_millis()
        );
        Ok(columns)
    }

    fn load_column(df: &DataFrame, col_name: &str) -> Result<LoadedColumn, PolarsError> {
        let col = df.column(col_name)?.cast(&DataType::String)?;
        let series = col.str()?;
        let data = series.into_iter().map(|v| v.map(str::to_string)).collect();
        debug!("Loaded column \"{col_name}\" ({} rows)", series.len());
        Ok(LoadedColumn {
            name: col_name.to_string(),
            data,
        })
    }

    fn detect_file_type(path: &Path) -> Result<FileType, AdmError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::Csv),
            Some("PARQUET") | Some("PQ") => Ok(FileType::Parquet),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::Arrow),
            _ => Err(AdmError::UnknownFileType),
        }
    }

    fn get_file_info(path: PathBuf) -> Result<FileInfo, AdmError> {
        let metadata = fs::metadata(&path).map_err(Self::io_error)?;
        if !metadata.is_file() {
            return Err(AdmError::LoadingFailed("Not a file!".into()));
        }

        let file_type = Self::detect_file_type(&path)?;

        Ok(FileInfo {
            path,
            file_size: metadata.len(),
            file_type,
        })
    }

    fn io_error(e: std::io::Error) -> AdmError {
        match e.kind() {
            ErrorKind::NotFound => AdmError::FileNotFound,
            ErrorKind::PermissionDenied => AdmError::PermissionDenied,
            _ => AdmError::IoError(e),
        }
    }

    fn polars_error(e: PolarsError) -> AdmError {
        if matches!(&e, PolarsError::IO { error, .. } if error.kind() == ErrorKind::NotFound) {
            AdmError::FileNotFound
        } else {
            AdmError::PolarsError(e)
        }
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .finish()
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }
}

impl<R: ListRecord> RecordSource<R> for FileSource {
    fn fetch_all(&self) -> Result<Vec<R>, AdmError> {
        let columns = self.load_columns()?;
        let lookup: HashMap<String, usize> = columns
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.name.clone(), idx))
            .collect();
        let nrows = columns.first().map(|c| c.data.len()).unwrap_or(0);

        let records = (0..nrows)
            .map(|row| R::from_row(&RawRow::new(&columns, &lookup, row)))
            .collect::<Result<Vec<R>, AdmError>>()?;
        info!("Loaded {} {} from {}", records.len(), R::TITLE, self.name());
        Ok(records)
    }
}
