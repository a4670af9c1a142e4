//! Persistence store for saved designs, plus debounced autosave.
//!
//! Designs live in one JSON file:
//!
//! ```json
//! {"version": 1, "designs": [{"id": "...", "name": "...", "type": "poster", ...}]}
//! ```
//!
//! A bare array (the unversioned layout) is still read and is rewritten in the
//! versioned layout on the next save.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::surface::{DocumentContent, Workspace};
use crate::templates::Template;

/// Current on-disk layout version.
pub const STORE_VERSION: u32 = 1;

/// Default quiet period before an autosave.
pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_secs(1);

/// `templateId` of designs created by the AI assistant.
pub const AI_TEMPLATE_ID: &str = "ai-generated";

/// One saved design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignRecord {
    pub id: String,
    pub name: String,
    /// Template category, e.g. `invitation` or `poster`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    /// Opaque editor project state, kept as-is.
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DesignRecord {
    pub fn document(&self) -> DocumentContent {
        DocumentContent::new(self.html.clone(), self.css.clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    designs: Vec<DesignRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Versioned(StoreFile),
    Legacy(Vec<DesignRecord>),
}

/// JSON-file backed collection of [`DesignRecord`]s.
///
/// Every operation reads the file, applies the change and writes it back
/// atomically. Operations within one process are serialized.
#[derive(Debug)]
pub struct DesignStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DesignStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every design, most recently updated first.
    pub fn all(&self) -> Result<Vec<DesignRecord>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut designs = self.read()?;
        sort_recent_first(&mut designs);
        Ok(designs)
    }

    /// Designs of one template category, most recently updated first.
    pub fn by_type(&self, kind: &str) -> Result<Vec<DesignRecord>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|design| design.kind == kind)
            .collect())
    }

    pub fn get(&self, id: &str) -> Result<Option<DesignRecord>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read()?.into_iter().find(|design| design.id == id))
    }

    /// Insert or replace by id. Stamps `updated_at`; a new record also gets
    /// `created_at`.
    pub fn save(&self, design: DesignRecord) -> Result<DesignRecord> {
        self.modify(|designs| {
            let mut design = design;
            let now = Utc::now();
            design.updated_at = now;
            match designs.iter_mut().find(|d| d.id == design.id) {
                Some(existing) => *existing = design.clone(),
                None => {
                    design.created_at = now;
                    designs.push(design.clone());
                }
            }
            Ok(design)
        })
    }

    /// Remove a design. Returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.modify(|designs| {
            let before = designs.len();
            designs.retain(|d| d.id != id);
            Ok(designs.len() != before)
        })
    }

    pub fn rename(&self, id: &str, name: &str) -> Result<DesignRecord> {
        self.modify(|designs| {
            let design = designs
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            design.name = name.to_string();
            design.updated_at = Utc::now();
            Ok(design.clone())
        })
    }

    /// Replace the HTML/CSS snapshot of an existing design.
    pub fn update_content(&self, id: &str, content: &DocumentContent) -> Result<DesignRecord> {
        self.modify(|designs| {
            let design = designs
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            design.html = content.html.clone();
            design.css = content.css.clone();
            if design.content.is_some() {
                design.content = Some(serde_json::Value::String(content.combined()));
            }
            design.updated_at = Utc::now();
            Ok(design.clone())
        })
    }

    /// New design named `My <template name>` seeded from a template.
    pub fn create_from_template(&self, template: &Template) -> Result<DesignRecord> {
        let now = Utc::now();
        self.save(DesignRecord {
            id: Uuid::new_v4().to_string(),
            name: format!("My {}", template.name),
            kind: template.kind.clone(),
            template_id: Some(template.id.clone()),
            html: template.html.clone(),
            css: template.css.clone(),
            content: Some(serde_json::Value::String(template.combined())),
            created_at: now,
            updated_at: now,
        })
    }

    /// New design from AI-generated HTML/CSS. No editor project state.
    pub fn create_from_ai(
        &self,
        name: Option<&str>,
        content: &DocumentContent,
        kind: Option<&str>,
    ) -> Result<DesignRecord> {
        let now = Utc::now();
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("AI Generated Design");
        self.save(DesignRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind: kind.unwrap_or("invitation").to_string(),
            template_id: Some(AI_TEMPLATE_ID.to_string()),
            html: content.html.clone(),
            css: content.css.clone(),
            content: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn modify<T>(&self, f: impl FnOnce(&mut Vec<DesignRecord>) -> Result<T>) -> Result<T> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut designs = self.read()?;
        let out = f(&mut designs)?;
        self.write(designs)?;
        Ok(out)
    }

    fn read(&self) -> Result<Vec<DesignRecord>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<OnDisk>(&text) {
            Ok(OnDisk::Versioned(file)) if file.version > STORE_VERSION => Err(Error::Store(
                format!("unsupported store version {}", file.version),
            )),
            Ok(OnDisk::Versioned(file)) => Ok(file.designs),
            Ok(OnDisk::Legacy(designs)) => Ok(designs),
            Err(e) => Err(Error::Store(format!(
                "{} is not a design store: {e}",
                self.path.display()
            ))),
        }
    }

    fn write(&self, designs: Vec<DesignRecord>) -> Result<()> {
        let file = StoreFile {
            version: STORE_VERSION,
            designs,
        };
        let json = serde_json::to_vec_pretty(&file)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let partial = self.path.with_extension("json.part");
        std::fs::write(&partial, json)?;
        std::fs::rename(&partial, &self.path)?;
        Ok(())
    }
}

fn sort_recent_first(designs: &mut [DesignRecord]) {
    designs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

/// Background task that writes the workspace back to the store after edits
/// go quiet.
///
/// Bursts of change notifications closer together than the debounce window
/// collapse into a single write.
#[derive(Debug)]
pub struct Autosaver {
    handle: JoinHandle<()>,
    writes: Arc<AtomicU64>,
}

impl Autosaver {
    pub fn spawn(
        store: Arc<DesignStore>,
        design_id: String,
        workspace: Arc<Mutex<Workspace>>,
        debounce: Duration,
    ) -> Self {
        let changes = workspace
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .changes();
        let writes = Arc::new(AtomicU64::new(0));
        let handle = tokio::spawn(run_autosave(
            store,
            design_id,
            workspace,
            changes,
            debounce,
            Arc::clone(&writes),
        ));
        Self { handle, writes }
    }

    /// Number of store writes performed so far.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Stop watching. A write already waiting out its debounce is dropped.
    pub fn stop(self) {
        self.handle.abort();
    }
}

async fn run_autosave(
    store: Arc<DesignStore>,
    design_id: String,
    workspace: Arc<Mutex<Workspace>>,
    mut changes: watch::Receiver<u64>,
    debounce: Duration,
    writes: Arc<AtomicU64>,
) {
    loop {
        if changes.changed().await.is_err() {
            return;
        }
        let mut closed = false;
        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        closed = true;
                        break;
                    }
                }
                _ = tokio::time::sleep(debounce) => break,
            }
        }

        let content = workspace
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .content();
        match store.update_content(&design_id, &content) {
            Ok(_) => {
                writes.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(design = %design_id, "autosaved");
            }
            Err(e) => tracing::warn!(design = %design_id, error = %e, "autosave failed"),
        }
        if closed {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, kind: &str) -> DesignRecord {
        let now = Utc::now();
        DesignRecord {
            id: id.to_string(),
            name: id.to_uppercase(),
            kind: kind.to_string(),
            template_id: None,
            html: "<p>x</p>".to_string(),
            css: String::new(),
            content: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DesignStore::open(dir.path().join("designs.json"));
        assert!(store.all().unwrap().is_empty());
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_save_sorts_and_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("designs.json");
        let store = DesignStore::open(&path);

        store.save(record("a", "poster")).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        store.save(record("b", "invitation")).unwrap();

        let ids: Vec<_> = store.all().unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["version"], 1);
        assert_eq!(on_disk["designs"][0]["type"], "poster");
        assert!(on_disk["designs"][0].get("updatedAt").is_some());
        assert!(on_disk["designs"][0].get("templateId").is_some());
    }

    #[test]
    fn test_resave_keeps_created_at() {
        let dir = tempfile::tempdir().unwrap();
        let store = DesignStore::open(dir.path().join("designs.json"));
        let first = store.save(record("a", "poster")).unwrap();

        let mut edited = first.clone();
        edited.html = "<p>y</p>".to_string();
        edited.created_at = Utc::now() + chrono::Duration::days(1);
        std::thread::sleep(Duration::from_millis(5));
        let second = store.save(edited).unwrap();

        assert!(second.updated_at > first.updated_at);
        assert_eq!(store.all().unwrap().len(), 1);
        assert_eq!(store.get("a").unwrap().unwrap().html, "<p>y</p>");
    }

    #[test]
    fn test_rename_delete_and_by_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = DesignStore::open(dir.path().join("designs.json"));
        store.save(record("a", "poster")).unwrap();
        store.save(record("b", "invitation")).unwrap();

        assert_eq!(store.rename("a", "Summer").unwrap().name, "Summer");
        assert!(matches!(store.rename("zzz", "x"), Err(Error::NotFound(_))));

        assert_eq!(store.by_type("poster").unwrap().len(), 1);
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert!(store.by_type("poster").unwrap().is_empty());
    }

    #[test]
    fn test_update_content_refreshes_project_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = DesignStore::open(dir.path().join("designs.json"));
        let mut seeded = record("a", "poster");
        seeded.content = Some(serde_json::Value::String("<style></style><p>x</p>".into()));
        store.save(seeded).unwrap();
        store.save(record("b", "poster")).unwrap();

        let edited = DocumentContent::new("<p>y</p>", "p{color:red}");
        let a = store.update_content("a", &edited).unwrap();
        assert_eq!(
            a.content,
            Some(serde_json::Value::String("<style>p{color:red}</style><p>y</p>".into()))
        );
        assert_eq!(store.get("a").unwrap().unwrap().content, a.content);

        let b = store.update_content("b", &edited).unwrap();
        assert_eq!(b.html, "<p>y</p>");
        assert!(b.content.is_none());
    }

    #[test]
    fn test_create_from_ai_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = DesignStore::open(dir.path().join("designs.json"));
        let design = store
            .create_from_ai(Some("  "), &DocumentContent::new("<p>a</p>", "p{}"), None)
            .unwrap();
        assert_eq!(design.name, "AI Generated Design");
        assert_eq!(design.kind, "invitation");
        assert_eq!(design.template_id.as_deref(), Some(AI_TEMPLATE_ID));
        assert!(design.content.is_none());
        assert_eq!(store.get(&design.id).unwrap().unwrap(), design);
    }

    #[test]
    fn test_reads_legacy_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("designs.json");
        let legacy = serde_json::to_string(&vec![record("old", "poster")]).unwrap();
        std::fs::write(&path, legacy).unwrap();

        let store = DesignStore::open(&path);
        assert_eq!(store.all().unwrap()[0].id, "old");
        store.rename("old", "Renamed").unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"version\": 1"));
    }

    #[test]
    fn test_future_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("designs.json");
        std::fs::write(&path, r#"{"version": 9, "designs": []}"#).unwrap();
        assert!(matches!(DesignStore::open(&path).all(), Err(Error::Store(_))));
    }
}
