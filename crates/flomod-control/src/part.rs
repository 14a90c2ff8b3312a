//! A single command-level node in a control file.

use flomod_core::{FileId, LogicId, PartId, PathInfo};
use serde::{Deserialize, Serialize};

/// What a part is: a file reference, a variable assignment, or an
/// uninterpreted line (comments, blanks) carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PartKind {
    File { path: PathInfo },
    Variable { value: String },
    Unknown { text: String },
}

/// Kind filter for sequence queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    File,
    Variable,
}

/// One parsed command-level node.
///
/// Identity is the opaque [`PartId`]; `parent` records the source file the
/// line came from. `logic` names the innermost conditional block enclosing
/// the part, if any. Sibling links join pipe-separated multi-file
/// occurrences of logically one command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    id: PartId,
    parent: FileId,
    pub command: String,
    pub kind: PartKind,
    pub logic: Option<LogicId>,
    pub sibling_prev: Option<PartId>,
    pub sibling_next: Option<PartId>,
}

impl Part {
    /// A file-reference part (`Read GIS == path`).
    pub fn new_file(parent: FileId, command: impl Into<String>, path: PathInfo) -> Self {
        Self {
            id: PartId::new(),
            parent,
            command: command.into(),
            kind: PartKind::File { path },
            logic: None,
            sibling_prev: None,
            sibling_next: None,
        }
    }

    /// A variable part (`Set Variable == value`).
    pub fn new_variable(
        parent: FileId,
        command: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: PartId::new(),
            parent,
            command: command.into(),
            kind: PartKind::Variable {
                value: value.into(),
            },
            logic: None,
            sibling_prev: None,
            sibling_next: None,
        }
    }

    /// An uninterpreted line carried verbatim.
    pub fn new_unknown(parent: FileId, text: impl Into<String>) -> Self {
        Self {
            id: PartId::new(),
            parent,
            command: String::new(),
            kind: PartKind::Unknown { text: text.into() },
            logic: None,
            sibling_prev: None,
            sibling_next: None,
        }
    }

    pub fn id(&self) -> PartId {
        self.id
    }

    pub fn parent(&self) -> FileId {
        self.parent
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, PartKind::File { .. })
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind, PartKind::Variable { .. })
    }

    pub fn matches_filter(&self, filter: KindFilter) -> bool {
        match filter {
            KindFilter::File => self.is_file(),
            KindFilter::Variable => self.is_variable(),
        }
    }

    /// The file path for file parts.
    pub fn path(&self) -> Option<&PathInfo> {
        match &self.kind {
            PartKind::File { path } => Some(path),
            _ => None,
        }
    }

    /// Mutable path for file parts.
    pub fn path_mut(&mut self) -> Option<&mut PathInfo> {
        match &mut self.kind {
            PartKind::File { path } => Some(path),
            _ => None,
        }
    }

    /// The assigned value for variable parts.
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            PartKind::Variable { value } => Some(value),
            _ => None,
        }
    }

    /// The right-hand side as written in the file.
    pub fn value_text(&self) -> String {
        match &self.kind {
            PartKind::File { path } => path.relative_str(),
            PartKind::Variable { value } => value.clone(),
            PartKind::Unknown { text } => text.clone(),
        }
    }

    /// Render this part's contribution to the output.
    ///
    /// Returns `(text, append_to_previous)`: sibling continuations are
    /// appended to the previous line with a ` | ` separator rather than
    /// emitted as lines of their own.
    pub fn format_line(&self) -> (String, bool) {
        if self.sibling_prev.is_some() {
            return (format!(" | {}", self.value_text()), true);
        }
        match &self.kind {
            PartKind::Unknown { text } => (text.clone(), false),
            _ => (format!("{} == {}", self.command, self.value_text()), false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_line_renders_command_and_value() {
        let part = Part::new_variable(FileId::new(), "Cell Size", "2.5");
        assert_eq!(part.format_line(), ("Cell Size == 2.5".to_string(), false));
    }

    #[test]
    fn sibling_continuation_appends_to_previous_line() {
        let parent = FileId::new();
        let mut second = Part::new_file(parent, "Read GIS", PathInfo::new("", "b.shp"));
        second.sibling_prev = Some(PartId::new());
        assert_eq!(second.format_line(), (" | b.shp".to_string(), true));
    }

    #[test]
    fn unknown_parts_render_verbatim() {
        let part = Part::new_unknown(FileId::new(), "! a comment");
        assert_eq!(part.format_line(), ("! a comment".to_string(), false));
    }

    #[test]
    fn kind_predicates() {
        let file = Part::new_file(FileId::new(), "Read File", PathInfo::new("", "x.trd"));
        assert!(file.is_file());
        assert!(file.matches_filter(KindFilter::File));
        assert!(!file.matches_filter(KindFilter::Variable));
        assert_eq!(file.value_text(), "x.trd");
    }
}
