//! Machine catalog backed by a directory of JSON records.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hikiluck_core::{MachineError, MachineKind, MachineLoader, MachineRecord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown machine id: {0}")]
    UnknownMachine(String),
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub id: String,
    pub label: String,
    pub kind: MachineKind,
    pub path: PathBuf,
    pub record: MachineRecord,
}

/// Every valid machine record found under a directory, sorted by label.
#[derive(Debug, Clone, Default)]
pub struct MachineCatalog {
    entries: Vec<CatalogEntry>,
}

impl MachineCatalog {
    /// Walk `dir` recursively and load every `*.json` file.
    ///
    /// Files that fail to parse or validate are skipped with a warning; on
    /// duplicate ids the first file (in path order) wins.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        collect_json_files(dir, &mut files)?;
        files.sort();

        let mut entries: Vec<CatalogEntry> = Vec::new();
        for path in files {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let record = match record_from_file(&path, &text) {
                Ok(record) => record,
                Err(err) => {
                    log::warn!("skipping {}: {err}", path.display());
                    continue;
                }
            };
            if entries.iter().any(|entry| entry.id == record.machine_id) {
                log::warn!(
                    "duplicate machine id {} in {}; keeping the first",
                    record.machine_id,
                    path.display()
                );
                continue;
            }
            log::debug!("catalog: {} <- {}", record.machine_id, path.display());
            entries.push(CatalogEntry {
                id: record.machine_id.clone(),
                label: record.label().to_string(),
                kind: record.kind(),
                path,
                record,
            });
        }

        entries.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));
        Ok(Self { entries })
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, machine_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.id == machine_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MachineLoader for MachineCatalog {
    type Error = CatalogError;

    fn load_machine(&self, machine_id: &str) -> Result<MachineRecord, Self::Error> {
        self.get(machine_id)
            .map(|entry| entry.record.clone())
            .ok_or_else(|| CatalogError::UnknownMachine(machine_id.to_string()))
    }

    fn machine_ids(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.id.clone()).collect()
    }
}

/// Parse and validate one record, taking the id from the file stem when the
/// record leaves it blank.
pub fn record_from_file(path: &Path, text: &str) -> Result<MachineRecord, MachineError> {
    let mut record = MachineRecord::from_json(text)?;
    if record.machine_id.trim().is_empty()
        && let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
    {
        record.machine_id = stem.to_string();
    }
    record.validate()?;
    Ok(record)
}

fn collect_json_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let listing = fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?;
    for entry in listing {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", dir.display()))?
            .path();
        if path.is_dir() {
            collect_json_files(&path, files)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            files.push(path);
        }
    }
    Ok(())
}
