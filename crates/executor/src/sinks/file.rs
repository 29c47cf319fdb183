//! FileSink - appends record values to files named by the resolved destination

use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use contracts::{Record, ResolutionMode, Sink, SinkError};
use resolver::{FieldTemplateResolver, Template};
use tracing::{debug, error, instrument, warn};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    ///
    /// # Errors
    /// Missing or blank `base_path`
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        params
            .get("base_path")
            .filter(|path| !path.trim().is_empty())
            .map(|path| Self {
                base_path: PathBuf::from(path),
            })
            .ok_or_else(|| "missing required param 'base_path'".to_string())
    }
}

/// Sink that appends each record value, newline terminated, to
/// `base_path/<destination>`
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    resolver: FieldTemplateResolver,
    template: Template,
    mode: ResolutionMode,
    created_dirs: HashSet<PathBuf>,
    staged: Vec<Result<PathBuf, String>>,
}

impl FileSink {
    /// Create a new FileSink, creating the base directory
    pub fn new(
        name: impl Into<String>,
        config: FileSinkConfig,
        resolver: FieldTemplateResolver,
        template: Template,
        mode: ResolutionMode,
    ) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            resolver,
            template,
            mode,
            created_dirs: HashSet::new(),
            staged: Vec::new(),
        })
    }

    /// Map a resolved destination to a path under the base directory
    fn destination_path(&self, destination: &str) -> Result<PathBuf, String> {
        let relative = Path::new(destination);
        if relative.as_os_str().is_empty() {
            return Err("destination is empty".to_string());
        }
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(format!(
                "destination '{destination}' escapes the base directory"
            ));
        }
        Ok(self.config.base_path.join(relative))
    }

    fn append(&mut self, path: &Path, record: &Record) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !self.created_dirs.contains(parent) {
                fs::create_dir_all(parent)?;
                self.created_dirs.insert(parent.to_path_buf());
            }
        }
        let mut line = Vec::with_capacity(record.value().len() + 1);
        line.extend_from_slice(record.value());
        line.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(&line)
    }
}

impl Sink for FileSink {
    fn sink_type(&self) -> &str {
        "file"
    }

    #[instrument(
        name = "file_sink_prepare",
        skip(self, records),
        fields(sink = %self.name, records = records.len())
    )]
    fn prepare(&mut self, records: &[Record]) -> Result<(), SinkError> {
        // a vanished base directory is a pipeline fault, not a record fault
        fs::create_dir_all(&self.config.base_path)?;

        let staged = records
            .iter()
            .map(|record| {
                self.resolver
                    .resolve_template(record, &self.template, self.mode)
                    .map_err(|e| e.to_string())
                    .and_then(|destination| self.destination_path(&destination))
            })
            .collect();
        self.staged = staged;
        Ok(())
    }

    #[instrument(
        name = "file_sink_execute",
        skip(self, records),
        fields(sink = %self.name, records = records.len())
    )]
    fn execute(&mut self, records: &[Record]) -> Result<Vec<Record>, SinkError> {
        if self.staged.len() != records.len() {
            return Err(SinkError::delivery("file", "batch was not prepared"));
        }

        let mut failed = Vec::new();
        for (record, path) in records.iter().zip(std::mem::take(&mut self.staged)) {
            let outcome = match path {
                Ok(path) => self.append(&path, record).map_err(|e| e.to_string()),
                Err(reason) => Err(reason),
            };
            if let Err(reason) = outcome {
                warn!(
                    sink = %self.name,
                    partition = record.partition(),
                    offset = record.offset(),
                    error = %reason,
                    "Record not written"
                );
                failed.push(record.clone());
            }
        }
        if !failed.is_empty() {
            error!(sink = %self.name, failed = failed.len(), "Write failed for some records");
        }
        Ok(failed)
    }

    #[instrument(name = "file_sink_close", skip(self))]
    fn close(&mut self) -> Result<(), SinkError> {
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}
