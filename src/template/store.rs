//! # Template Store
//!
//! Flat-file persistence for label templates: one pretty-printed JSON
//! record per template at `<root>/<id>.json`. The store is a collaborator
//! boundary; the rendering core only ever reads one record per job.
//!
//! Corrupt files are skipped during listing rather than failing the whole
//! listing; an operator can delete or fix them without losing access to
//! the healthy records.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::template::PrintTemplate;

/// Directory-backed template store keyed by template id.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// All templates, newest first. Files that fail to parse are skipped
    /// with a warning.
    pub fn list(&self) -> Result<Vec<PrintTemplate>, StoreError> {
        let mut templates = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|json| Ok(serde_json::from_str::<PrintTemplate>(&json)?))
            {
                Ok(template) => templates.push(template),
                Err(e) => log::warn!("skipping unreadable template {}: {}", path.display(), e),
            }
        }
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    /// Load one template by id.
    pub fn load(&self, id: &str) -> Result<PrintTemplate, StoreError> {
        if id.trim().is_empty() {
            return Err(StoreError::EmptyId);
        }
        let path = self.path_for(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Persist a new template, minting an id if the record has none.
    /// Returns the id the record was stored under.
    pub fn save(&self, template: &mut PrintTemplate) -> Result<String, StoreError> {
        if template.id.trim().is_empty() {
            template.id = Uuid::new_v4().to_string();
        }
        self.write_record(template)?;
        Ok(template.id.clone())
    }

    /// Overwrite an existing template. The creation timestamp is refreshed
    /// to mark the update, matching the record lifecycle of the original
    /// service. Fails if the id is empty or the record does not exist.
    pub fn update(&self, template: &mut PrintTemplate) -> Result<(), StoreError> {
        if template.id.trim().is_empty() {
            return Err(StoreError::EmptyId);
        }
        if !self.path_for(&template.id).exists() {
            return Err(StoreError::NotFound(template.id.clone()));
        }
        template.created_at = Utc::now();
        self.write_record(template)
    }

    /// Remove a template. Deleting an id that does not exist is a no-op.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        if id.trim().is_empty() {
            return Err(StoreError::EmptyId);
        }
        let path = self.path_for(id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn write_record(&self, template: &PrintTemplate) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(template)?;
        fs::write(self.path_for(&template.id), json)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
