//! Single-owner view switching over a [`DocumentSurface`].

use std::fmt;

use tokio::sync::watch;

use super::{format_code, DocumentContent, DocumentSurface};
use crate::error::{Error, Result};

/// Which component holds the writable copy of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// The interactive editing surface.
    #[default]
    Canvas,
    /// The raw, formatted HTML/CSS text.
    Code,
    /// The AI coordinator, mid-transaction.
    Ai,
}

impl View {
    pub fn name(self) -> &'static str {
        match self {
            View::Canvas => "canvas",
            View::Code => "code",
            View::Ai => "ai",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Owns the document and hands write access to one view at a time.
///
/// Moving between `Canvas` and `Code` copies the document out of the surface
/// (formatted) or back into it. Code that was never edited is not written
/// back, so the surface keeps its markup byte for byte. The AI view is entered with [`begin_ai`] and
/// left with [`finish_ai`] or [`abort_ai`]; while it is held, every other
/// write is refused.
///
/// [`begin_ai`]: Workspace::begin_ai
/// [`finish_ai`]: Workspace::finish_ai
/// [`abort_ai`]: Workspace::abort_ai
pub struct Workspace {
    surface: Box<dyn DocumentSurface>,
    view: View,
    resume: View,
    code: DocumentContent,
    /// The code copy as last formatted from the surface.
    code_origin: DocumentContent,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("view", &self.view)
            .field("code", &self.code)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    pub fn new(surface: Box<dyn DocumentSurface>) -> Self {
        Self {
            surface,
            view: View::Canvas,
            resume: View::Canvas,
            code: DocumentContent::default(),
            code_origin: DocumentContent::default(),
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// The authoritative document as its current owner sees it.
    pub fn content(&self) -> DocumentContent {
        match self.view {
            View::Code => self.code.clone(),
            View::Canvas | View::Ai => self.surface.content(),
        }
    }

    /// Change notifications from the underlying surface.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.surface.changes()
    }

    /// Move ownership between the canvas and the code view.
    pub fn switch_view(&mut self, to: View) -> Result<()> {
        if self.view == View::Ai {
            return Err(Error::NotOwner(View::Ai.name()));
        }
        if to == View::Ai {
            return Err(Error::InvalidConfig(
                "the ai view is entered through begin_ai".to_string(),
            ));
        }
        if to == self.view {
            return Ok(());
        }
        if to == View::Code {
            self.refresh_code();
        } else {
            self.commit_code();
        }
        tracing::debug!(from = %self.view, to = %to, "view switched");
        self.view = to;
        Ok(())
    }

    /// Mutable access to the canvas surface, only while it owns the document.
    pub fn surface_mut(&mut self) -> Result<&mut dyn DocumentSurface> {
        match self.view {
            View::Canvas => Ok(self.surface.as_mut()),
            other => Err(Error::NotOwner(other.name())),
        }
    }

    /// Replace the raw code, only while the code view owns the document.
    pub fn edit_code(&mut self, content: DocumentContent) -> Result<()> {
        match self.view {
            View::Code => {
                self.code = content;
                Ok(())
            }
            other => Err(Error::NotOwner(other.name())),
        }
    }

    /// Hand the document to the AI coordinator and return a snapshot of it.
    ///
    /// Pending code edits are written back to the surface first.
    pub fn begin_ai(&mut self) -> Result<DocumentContent> {
        match self.view {
            View::Ai => return Err(Error::NotOwner(View::Ai.name())),
            View::Code => self.commit_code(),
            View::Canvas => {}
        }
        self.resume = self.view;
        self.view = View::Ai;
        Ok(self.surface.content())
    }

    /// Return ownership from the AI coordinator, writing `result` if present.
    pub fn finish_ai(&mut self, result: Option<&DocumentContent>) -> Result<()> {
        if self.view != View::Ai {
            return Err(Error::NotOwner(self.view.name()));
        }
        if let Some(content) = result {
            self.surface.set_content(content);
        }
        self.refresh_code();
        self.view = self.resume;
        Ok(())
    }

    fn refresh_code(&mut self) {
        self.code = format_code(&self.surface.content());
        self.code_origin = self.code.clone();
    }

    /// Write the code copy back to the surface if it was edited.
    fn commit_code(&mut self) {
        if self.code != self.code_origin {
            self.surface.set_content(&self.code);
            self.code_origin = self.code.clone();
        }
    }

    /// Leave the AI view without touching the document. No-op otherwise.
    pub fn abort_ai(&mut self) {
        if self.view == View::Ai {
            self.view = self.resume;
        }
    }
}
