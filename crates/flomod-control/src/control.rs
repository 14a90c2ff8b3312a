//! The control-file aggregate: one main file plus every file it pulls in,
//! flattened into a single part sequence and logic set.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use flomod_core::{FileId, LogicId, PartId, PathInfo, Scope};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logic::{LogicBlock, LogicKind, LogicSet};
use crate::parser;
use crate::part::{KindFilter, Part};
use crate::sequence::{FetchFilter, PartSequence, Position};

/// Recognised control-file roles, keyed by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFileKind {
    /// Main control file (.tcf).
    Tcf,
    /// Geometry control file (.tgc).
    Tgc,
    /// Boundary condition control file (.tbc).
    Tbc,
    /// Estuary control file (.ecf).
    Ecf,
    /// Read file fragment (.trd).
    Trd,
    Other,
}

impl ModelFileKind {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_lowercase().as_str() {
            "tcf" => Self::Tcf,
            "tgc" => Self::Tgc,
            "tbc" => Self::Tbc,
            "ecf" => Self::Ecf,
            "trd" => Self::Trd,
            _ => Self::Other,
        }
    }

    /// Whether the extension names a file whose contents belong in the
    /// aggregate rather than being model data.
    pub fn is_control_extension(extension: &str) -> bool {
        !matches!(Self::from_extension(extension), Self::Other)
    }
}

/// One source file participating in a control-file aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    id: FileId,
    pub kind: ModelFileKind,
    pub path: PathInfo,
    /// The file whose command pulled this one in; `None` for a main file.
    pub parent: Option<FileId>,
}

impl ModelFile {
    pub fn new(kind: ModelFileKind, path: PathInfo) -> Self {
        Self {
            id: FileId::new(),
            kind,
            path,
            parent: None,
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }
}

/// Where to splice a child control file relative to an existing file's
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Directly after the last part/block/entry belonging to the file.
    After(FileId),
    /// Directly before the first part/block/entry belonging to the file.
    Before(FileId),
}

impl Anchor {
    fn target(self) -> FileId {
        match self {
            Anchor::After(id) | Anchor::Before(id) => id,
        }
    }
}

/// Criteria for [`ControlFile::contains`]; every populated field must
/// match. Matching is case-insensitive and substring-based for filenames.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainsQuery<'a> {
    pub command: Option<&'a str>,
    pub variable: Option<&'a str>,
    pub filename: Option<&'a str>,
}

/// A main control file together with everything it includes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlFile {
    pub kind: ModelFileKind,
    pub parts: PartSequence,
    pub logic: LogicSet,
    /// Participating files in document order; the main file is first.
    control_files: Vec<ModelFile>,
}

impl ControlFile {
    pub fn new(main_file: ModelFile) -> Self {
        Self {
            kind: main_file.kind,
            parts: PartSequence::new(),
            logic: LogicSet::new(),
            control_files: vec![main_file],
        }
    }

    /// Parse a control file from disk.
    pub fn load(path: impl AsRef<Path>, kind: ModelFileKind) -> Result<Self> {
        let path = path.as_ref();
        let lines = flomod_fs::read_lines(path)?;
        let main = ModelFile::new(kind, PathInfo::from_absolute(path));
        tracing::debug!(path = %path.display(), lines = lines.len(), "loading control file");
        let parsed = parser::parse_lines(&lines, main.id(), main.path.root())?;
        Ok(Self {
            kind,
            parts: parsed.parts,
            logic: parsed.logic,
            control_files: vec![main],
        })
    }

    /// Write every participating file back to disk.
    pub fn save(&self) -> Result<()> {
        for (path, lines) in self.printable_contents() {
            flomod_fs::write_lines(&path, &lines)?;
        }
        Ok(())
    }

    pub fn main_file(&self) -> &ModelFile {
        &self.control_files[0]
    }

    pub fn control_files(&self) -> &[ModelFile] {
        &self.control_files
    }

    pub fn file_entry(&self, id: FileId) -> Option<&ModelFile> {
        self.control_files.iter().find(|f| f.id() == id)
    }

    pub fn file_entry_mut(&mut self, id: FileId) -> Option<&mut ModelFile> {
        self.control_files.iter_mut().find(|f| f.id() == id)
    }

    /// The include chain from a file up to its main-file root, starting
    /// with the file itself.
    pub fn parent_chain(&self, id: FileId) -> Vec<FileId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            if chain.contains(&id) || chain.len() > 64 {
                tracing::warn!(%id, "include chain cycle; truncating");
                break;
            }
            chain.push(id);
            current = self.file_entry(id).and_then(|f| f.parent);
        }
        chain
    }

    /// Whether `target` is `start` or one of its ancestors in the
    /// include chain.
    pub fn chain_includes(&self, start: FileId, target: FileId) -> bool {
        let mut current = Some(start);
        let mut guard = 0;
        while let Some(id) = current {
            if id == target {
                return true;
            }
            guard += 1;
            if guard > 64 {
                tracing::warn!(%start, "include chain too deep; assuming no ancestry");
                return false;
            }
            current = self.file_entry(id).and_then(|f| f.parent);
        }
        false
    }

    /// File-reference parts, first occurrence of each command.
    pub fn files(&self, command: Option<&str>, scope: Option<&Scope>) -> Vec<&Part> {
        self.parts.fetch(
            FetchFilter {
                kind: Some(KindFilter::File),
                command,
                scope,
                ..FetchFilter::default()
            },
            &self.logic,
        )
    }

    /// Every file-reference part, duplicates included.
    pub fn all_files(&self, command: Option<&str>, scope: Option<&Scope>) -> Vec<&Part> {
        self.parts.fetch(
            FetchFilter {
                kind: Some(KindFilter::File),
                command,
                dedupe: false,
                scope,
            },
            &self.logic,
        )
    }

    /// Variable parts, first occurrence of each command.
    pub fn variables(&self, command: Option<&str>, scope: Option<&Scope>) -> Vec<&Part> {
        self.parts.fetch(
            FetchFilter {
                kind: Some(KindFilter::Variable),
                command,
                scope,
                ..FetchFilter::default()
            },
            &self.logic,
        )
    }

    /// Every variable part, duplicates included.
    pub fn all_variables(&self, command: Option<&str>, scope: Option<&Scope>) -> Vec<&Part> {
        self.parts.fetch(
            FetchFilter {
                kind: Some(KindFilter::Variable),
                command,
                dedupe: false,
                scope,
            },
            &self.logic,
        )
    }

    /// Logic blocks, optionally restricted to one kind.
    pub fn logics(&self, kind: Option<LogicKind>) -> Vec<&LogicBlock> {
        self.logic
            .iter()
            .filter(|b| kind.is_none_or(|k| b.kind == k))
            .collect()
    }

    /// Whether a part is visible under a scope, walking its nesting chain.
    pub fn in_scope(&self, part: PartId, scope: &Scope) -> bool {
        match self.parts.get(part) {
            Some(p) => self.logic.in_scope(p.logic, scope),
            None => false,
        }
    }

    /// Parts matching every populated criterion. An empty query matches
    /// nothing.
    pub fn contains(&self, query: ContainsQuery<'_>) -> Vec<&Part> {
        if query.command.is_none() && query.variable.is_none() && query.filename.is_none() {
            return Vec::new();
        }
        self.parts
            .iter()
            .filter(|part| {
                if let Some(command) = query.command
                    && !part.command.eq_ignore_ascii_case(command)
                {
                    return false;
                }
                if let Some(variable) = query.variable {
                    let Some(value) = part.value() else {
                        return false;
                    };
                    if !value.eq_ignore_ascii_case(variable) {
                        return false;
                    }
                }
                if let Some(filename) = query.filename {
                    let Some(name) = part.path().and_then(PathInfo::filename_and_extension)
                    else {
                        return false;
                    };
                    if !name.to_lowercase().contains(&filename.to_lowercase()) {
                        return false;
                    }
                }
                true
            })
            .collect()
    }

    /// File-reference parts whose resolved path does not exist on disk.
    pub fn check_paths_exist(&self, scope: Option<&Scope>) -> Vec<&Part> {
        self.all_files(None, scope)
            .into_iter()
            .filter(|p| p.path().is_some_and(|info| !info.absolute().exists()))
            .collect()
    }

    /// Rewrite the root of every file entry and file-reference part.
    ///
    /// With `must_exist`, the new root has to be an existing directory.
    pub fn update_root(&mut self, new_root: impl AsRef<Path>, must_exist: bool) -> Result<()> {
        let new_root = new_root.as_ref();
        if must_exist && !new_root.is_dir() {
            return Err(Error::InvalidPath {
                path: new_root.to_path_buf(),
            });
        }
        tracing::info!(root = %new_root.display(), "updating model root");
        for file in &mut self.control_files {
            file.path.set_root(new_root);
        }
        for part in 0..self.parts.len() {
            let id = self.parts[part].id();
            if let Some(path) = self.parts.get_mut(id).and_then(Part::path_mut) {
                path.set_root(new_root);
            }
        }
        Ok(())
    }

    /// The contiguous run of part indexes belonging to `target` or a file
    /// that chains up to it: `(ids, first_index, last_index)`.
    fn parts_with_ancestor(&self, target: FileId) -> (Vec<PartId>, Option<usize>, Option<usize>) {
        let mut ids = Vec::new();
        let mut first = None;
        let mut last = None;
        for (i, part) in self.parts.iter().enumerate() {
            if self.chain_includes(part.parent(), target) {
                ids.push(part.id());
                first.get_or_insert(i);
                last = Some(i);
            }
        }
        (ids, first, last)
    }

    fn logics_with_ancestor(&self, target: FileId) -> (Vec<LogicId>, Option<usize>, Option<usize>) {
        let mut ids = Vec::new();
        let mut first = None;
        let mut last = None;
        for (i, block) in self.logic.iter().enumerate() {
            if self.chain_includes(block.parent(), target) {
                ids.push(block.id());
                first.get_or_insert(i);
                last = Some(i);
            }
        }
        (ids, first, last)
    }

    fn entries_with_ancestor(&self, target: FileId) -> (Vec<FileId>, Option<usize>, Option<usize>) {
        let mut ids = Vec::new();
        let mut first = None;
        let mut last = None;
        for (i, entry) in self.control_files.iter().enumerate() {
            if self.chain_includes(entry.id(), target) {
                ids.push(entry.id());
                first.get_or_insert(i);
                last = Some(i);
            }
        }
        (ids, first, last)
    }

    /// Splice another aggregate's parts, logic, and file entries into this
    /// one, adjacent to the anchor file's content.
    pub fn add_control_file(&mut self, child: ControlFile, anchor: Anchor) -> Result<()> {
        let child_main = child.main_file().id();
        if self.file_entry(child_main).is_some() {
            return Err(Error::AlreadyExists {
                what: format!("control file {child_main}"),
            });
        }
        let target = anchor.target();
        let target_parent = self
            .file_entry(target)
            .ok_or_else(|| Error::NotFound {
                what: format!("control file {target}"),
            })?
            .parent;

        let (_, part_first, part_last) = self.parts_with_ancestor(target);
        let (_, logic_first, logic_last) = self.logics_with_ancestor(target);
        let (_, entry_first, entry_last) = self.entries_with_ancestor(target);
        let (part_at, logic_at, entry_at) = match anchor {
            Anchor::After(_) => (
                part_last.map(|i| i + 1).unwrap_or(self.parts.len()),
                logic_last.map(|i| i + 1).unwrap_or(self.logic.len()),
                entry_last.map(|i| i + 1).unwrap_or(self.control_files.len()),
            ),
            Anchor::Before(_) => (
                part_first.unwrap_or(self.parts.len()),
                logic_first.unwrap_or(self.logic.len()),
                entry_first.unwrap_or(self.control_files.len()),
            ),
        };

        let ControlFile {
            parts,
            logic,
            mut control_files,
            ..
        } = child;
        // The spliced-in main file becomes a sibling of the anchor.
        control_files[0].parent = target_parent;
        self.parts.insert_many(part_at, parts.into_parts());
        self.logic.insert_many(logic_at, logic.into_blocks());
        let entry_at = entry_at.min(self.control_files.len());
        self.control_files.splice(entry_at..entry_at, control_files);
        Ok(())
    }

    /// Remove a file and everything that chains up to it.
    pub fn remove_control_file(&mut self, target: FileId) -> Result<()> {
        if self.file_entry(target).is_none() {
            return Err(Error::NotFound {
                what: format!("control file {target}"),
            });
        }
        if target == self.main_file().id() {
            return Err(Error::InvalidArgument {
                message: "cannot remove the main control file".to_string(),
            });
        }
        let (part_ids, _, _) = self.parts_with_ancestor(target);
        let (logic_ids, _, _) = self.logics_with_ancestor(target);
        let (entry_ids, _, _) = self.entries_with_ancestor(target);
        for id in part_ids.into_iter().rev() {
            self.parts.remove(id)?;
        }
        for id in logic_ids.into_iter().rev() {
            self.logic.remove(id);
        }
        self.control_files.retain(|f| !entry_ids.contains(&f.id()));
        Ok(())
    }

    /// Swap a file's content for another aggregate's, in place.
    pub fn replace_control_file(&mut self, child: ControlFile, old: FileId) -> Result<()> {
        let child_main = child.main_file().id();
        if self.file_entry(child_main).is_some() {
            return Err(Error::AlreadyExists {
                what: format!("control file {child_main}"),
            });
        }
        self.add_control_file(child, Anchor::Before(old))?;
        self.remove_control_file(old)
    }

    /// Insert a part, registering it with a logic block when the anchor
    /// carries one.
    pub fn add_part(&mut self, part: Part, position: Position) -> Result<()> {
        let id = part.id();
        self.parts.add(part, position)?;
        self.register_member(id, position);
        Ok(())
    }

    /// Insert a part inside a specific logic block.
    pub fn add_part_to_logic(
        &mut self,
        logic: LogicId,
        part: Part,
        position: Position,
    ) -> Result<()> {
        if self.logic.get(logic).is_none() {
            return Err(Error::NotFound {
                what: format!("logic block {logic}"),
            });
        }
        let id = part.id();
        self.parts.add(part, position)?;
        if let Some(p) = self.parts.get_mut(id) {
            p.logic = Some(logic);
        }
        let anchor = match position {
            Position::After(a) | Position::Before(a) => Some(a),
            Position::Default => None,
        };
        if let Some(block) = self.logic.get_mut(logic) {
            match anchor {
                Some(a) if block.contains(a) => block.add_member_after(id, a),
                _ => block.add_member(id),
            }
        }
        Ok(())
    }

    /// Remove a part, unregistering it from its logic block.
    pub fn remove_part(&mut self, id: PartId) -> Result<Part> {
        let removed = self.parts.remove(id)?;
        if let Some(logic) = removed.logic {
            self.logic.remove_part(logic, id);
            self.logic.prune_closed();
        }
        Ok(removed)
    }

    /// Take a part out of its logic block but keep it in the sequence.
    ///
    /// The part moves to just after the block's last remaining member (so
    /// it sits outside the block's run) and is re-associated with the
    /// block's nesting parent, if any.
    pub fn remove_part_from_logic(&mut self, logic: LogicId, id: PartId) -> Result<()> {
        let nesting_parent = self
            .logic
            .get(logic)
            .ok_or_else(|| Error::NotFound {
                what: format!("logic block {logic}"),
            })?
            .nesting_parent;
        let removal = self.logic.remove_part(logic, id).ok_or_else(|| Error::NotFound {
            what: format!("part {id} in logic block {logic}"),
        })?;
        match removal.last_member {
            Some(anchor) => {
                self.parts.move_part(id, Position::After(anchor))?;
            }
            None => {
                self.logic.prune_closed();
            }
        }
        if let Some(part) = self.parts.get_mut(id) {
            part.logic = nesting_parent;
        }
        if let Some(parent) = nesting_parent
            && let Some(block) = self.logic.get_mut(parent)
        {
            block.add_member(id);
        }
        Ok(())
    }

    fn register_member(&mut self, id: PartId, position: Position) {
        let Some(logic) = self.parts.get(id).and_then(|p| p.logic) else {
            return;
        };
        let anchor = match position {
            Position::After(a) | Position::Before(a) => Some(a),
            Position::Default => None,
        };
        if let Some(block) = self.logic.get_mut(logic) {
            match anchor {
                Some(a) if block.contains(a) => block.add_member_after(id, a),
                _ => block.add_member(id),
            }
        }
    }

    /// Render every participating file as canonical output lines, keyed by
    /// resolved path.
    ///
    /// Indentation is one tab per nesting level; each block's markers are
    /// emitted exactly once, and branch transitions within a chain are
    /// written as `Else If`/`Else` lines rather than close/reopen pairs.
    pub fn printable_contents(&self) -> BTreeMap<PathBuf, Vec<String>> {
        let mut by_file: BTreeMap<FileId, Vec<String>> = BTreeMap::new();
        let mut stacks: BTreeMap<FileId, Vec<LogicId>> = BTreeMap::new();
        for entry in &self.control_files {
            by_file.entry(entry.id()).or_default();
        }

        for part in self.parts.iter() {
            let file = part.parent();
            let lines = by_file.entry(file).or_default();
            let stack = stacks.entry(file).or_default();
            let target = self.logic_chain(part.logic);
            self.emit_transition(lines, stack, &target);

            let (text, append) = part.format_line();
            if append {
                match lines.last_mut() {
                    Some(last) => last.push_str(&text),
                    None => lines.push(text.trim_start().to_string()),
                }
            } else if text.is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("{}{}", indent(stack.len()), text));
            }
        }

        for (file, stack) in &mut stacks {
            let lines = by_file.entry(*file).or_default();
            while let Some(top) = stack.pop() {
                let end = self
                    .logic
                    .get(top)
                    .map(LogicBlock::end_line)
                    .unwrap_or("End If");
                lines.push(format!("{}{}", indent(stack.len()), end));
            }
        }

        by_file
            .into_iter()
            .map(|(file, lines)| {
                let path = self
                    .file_entry(file)
                    .map(|f| f.path.absolute())
                    .unwrap_or_else(|| PathBuf::from(file.to_string()));
                (path, lines)
            })
            .collect()
    }

    /// A part's enclosing blocks, outermost first.
    fn logic_chain(&self, innermost: Option<LogicId>) -> Vec<LogicId> {
        let mut chain = Vec::new();
        let mut current = innermost;
        let mut guard = 0;
        while let Some(id) = current {
            guard += 1;
            if guard > 64 {
                tracing::warn!(%id, "logic nesting chain too deep; truncating output nesting");
                break;
            }
            chain.push(id);
            current = self.logic.get(id).and_then(|b| b.nesting_parent);
        }
        chain.reverse();
        chain
    }

    /// Emit the marker lines taking `stack` to `target`.
    fn emit_transition(&self, lines: &mut Vec<String>, stack: &mut Vec<LogicId>, target: &[LogicId]) {
        let common = stack
            .iter()
            .zip(target)
            .take_while(|(a, b)| *a == *b)
            .count();
        while stack.len() > common {
            // A sibling branch of the same chain continues at this depth:
            // write its Else line instead of closing the chain.
            if stack.len() == common + 1
                && target.len() > common
                && self.is_chain_continuation(stack[stack.len() - 1], target[common])
            {
                let Some(top) = stack.pop() else {
                    break;
                };
                self.open_branch(lines, stack.len(), Some(top), target[common]);
                stack.push(target[common]);
                break;
            }
            let Some(top) = stack.pop() else {
                break;
            };
            let end = self
                .logic
                .get(top)
                .map(LogicBlock::end_line)
                .unwrap_or("End If");
            lines.push(format!("{}{}", indent(stack.len()), end));
        }
        while stack.len() < target.len() {
            let next = target[stack.len()];
            self.open_branch(lines, stack.len(), None, next);
            stack.push(next);
        }
    }

    /// Emit a block's open marker, preceded by the markers of any earlier
    /// branches of its chain that own no parts themselves. Those branches
    /// never become a serialization target, but their lines still have to
    /// appear for the chain to reparse. `after` bounds the scan when the
    /// previous branch was just closed by a chain continuation.
    fn open_branch(
        &self,
        lines: &mut Vec<String>,
        depth: usize,
        after: Option<LogicId>,
        next: LogicId,
    ) {
        let Some(block) = self.logic.get(next) else {
            lines.push(indent(depth));
            return;
        };
        if block.chain.is_some() {
            let head = block.chain_head();
            let mut past_anchor = after.is_none();
            for sibling in self.logic.iter() {
                if sibling.id() == next {
                    break;
                }
                if after == Some(sibling.id()) {
                    past_anchor = true;
                    continue;
                }
                if past_anchor && sibling.chain_head() == head {
                    lines.push(format!("{}{}", indent(depth), sibling.open_line()));
                }
            }
        }
        lines.push(format!("{}{}", indent(depth), block.open_line()));
    }

    fn is_chain_continuation(&self, from: LogicId, to: LogicId) -> bool {
        let (Some(from), Some(to)) = (self.logic.get(from), self.logic.get(to)) else {
            return false;
        };
        matches!(to.kind, LogicKind::ElseIf | LogicKind::Else)
            && from.chain_head() == to.chain_head()
    }
}

fn indent(depth: usize) -> String {
    "\t".repeat(depth)
}
