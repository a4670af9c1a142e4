//! Starter templates loaded from a directory tree.
//!
//! Layout: `<root>/<type>/<name>/` holding one `.html` file and optionally
//! one `.css` file. A template's id is `<type>-<name>`; its display name is
//! the directory name in title case (`college-event` -> `College Event`).

use std::path::Path;

use crate::error::Result;
use crate::surface::DocumentContent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: String,
    /// Category, taken from the parent directory (`invitation`, `poster`, ...).
    pub kind: String,
    pub name: String,
    pub html: String,
    pub css: String,
}

impl Template {
    pub fn document(&self) -> DocumentContent {
        DocumentContent::new(self.html.clone(), self.css.clone())
    }

    /// `<style>{css}</style>{html}`.
    pub fn combined(&self) -> String {
        self.document().combined()
    }
}

/// Title-case a dash separated slug.
pub fn display_name(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Load every template under `root`, sorted by id. Directories without an
/// HTML file are skipped.
pub fn load_templates(root: &Path) -> Result<Vec<Template>> {
    let mut templates = Vec::new();
    for kind_entry in std::fs::read_dir(root)? {
        let kind_entry = kind_entry?;
        if !kind_entry.file_type()?.is_dir() {
            continue;
        }
        let kind = kind_entry.file_name().to_string_lossy().into_owned();
        for entry in std::fs::read_dir(kind_entry.path())? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let slug = entry.file_name().to_string_lossy().into_owned();
            let Some(html) = read_first_with_extension(&entry.path(), "html")? else {
                tracing::debug!(dir = %entry.path().display(), "skipping template without html");
                continue;
            };
            let css = read_first_with_extension(&entry.path(), "css")?.unwrap_or_default();
            templates.push(Template {
                id: format!("{kind}-{slug}"),
                kind: kind.clone(),
                name: display_name(&slug),
                html,
                css,
            });
        }
    }
    templates.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(templates)
}

/// Find a template by id.
pub fn find_template<'a>(templates: &'a [Template], id: &str) -> Option<&'a Template> {
    templates.iter().find(|t| t.id == id)
}

fn read_first_with_extension(dir: &Path, extension: &str) -> Result<Option<String>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .collect();
    paths.sort();
    match paths.first() {
        Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
        None => Ok(None),
    }
}
