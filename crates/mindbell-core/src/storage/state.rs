//! Persisted "current schedule" record.
//!
//! The dispatcher reads the record when invoked and writes its next
//! decision back; the alarm scheduler only keeps time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    #[default]
    Inactive,
    Active,
    Meditating,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub mode: ScheduleMode,
    /// Absolute time of the pending alarm (epoch ms).
    #[serde(default)]
    pub next_fire_millis: Option<i64>,
    /// Period index the pending meditation alarm will carry.
    #[serde(default)]
    pub meditation_period: Option<u32>,
    /// Regular bell was on when the meditation started.
    #[serde(default)]
    pub resume_active: bool,
}

pub trait ScheduleStore {
    fn load(&self) -> Result<ScheduleRecord>;
    fn save(&mut self, record: &ScheduleRecord) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: ScheduleRecord,
}

impl MemoryStore {
    pub fn new(record: ScheduleRecord) -> Self {
        Self { record }
    }
}

impl ScheduleStore for MemoryStore {
    fn load(&self) -> Result<ScheduleRecord> {
        Ok(self.record.clone())
    }

    fn save(&mut self, record: &ScheduleRecord) -> Result<()> {
        self.record = record.clone();
        Ok(())
    }
}

/// JSON file store. A missing file reads as the default (inactive) record.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/schedule.json`.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(super::data_dir()?.join("schedule.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScheduleStore for FileStore {
    fn load(&self) -> Result<ScheduleRecord> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ScheduleRecord::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&mut self, record: &ScheduleRecord) -> Result<()> {
        let content = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
