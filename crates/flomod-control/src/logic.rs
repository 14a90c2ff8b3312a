//! Conditional (If/Else/Define) blocks and scope evaluation.

use flomod_core::{FileId, LogicId, PartId, Scope, ScopeKey};
use serde::{Deserialize, Serialize};

/// The branch kind of a conditional block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicKind {
    If,
    ElseIf,
    Else,
    Define,
}

/// A paired start/end conditional region scoping a contiguous run of parts.
///
/// `chain` links ElseIf/Else branches back to their chain-head If so that
/// serialization can emit branch transitions without closing the chain, and
/// so that an Else knows which sibling conditions it negates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicBlock {
    id: LogicId,
    parent: FileId,
    pub kind: LogicKind,
    /// The condition key as written in the file ("Scenario", "Event",
    /// "Output Zone", ...). Empty for Else.
    pub raw_key: String,
    /// The scope axis this block tests, when the key names one.
    pub key: Option<ScopeKey>,
    pub values: Vec<String>,
    /// Conditions of the preceding branches in this chain (Else only).
    pub negates: Vec<(ScopeKey, Vec<String>)>,
    pub nesting_parent: Option<LogicId>,
    pub chain: Option<LogicId>,
    members: Vec<PartId>,
    closed: bool,
}

impl LogicBlock {
    /// A chain-head If block.
    pub fn new_if(
        parent: FileId,
        raw_key: impl Into<String>,
        key: Option<ScopeKey>,
        values: Vec<String>,
        nesting_parent: Option<LogicId>,
    ) -> Self {
        Self {
            id: LogicId::new(),
            parent,
            kind: LogicKind::If,
            raw_key: raw_key.into(),
            key,
            values,
            negates: Vec::new(),
            nesting_parent,
            chain: None,
            members: Vec::new(),
            closed: false,
        }
    }

    /// An Else If continuation of `head`'s chain.
    pub fn new_else_if(
        parent: FileId,
        raw_key: impl Into<String>,
        key: Option<ScopeKey>,
        values: Vec<String>,
        head: LogicId,
        negates: Vec<(ScopeKey, Vec<String>)>,
        nesting_parent: Option<LogicId>,
    ) -> Self {
        Self {
            id: LogicId::new(),
            parent,
            kind: LogicKind::ElseIf,
            raw_key: raw_key.into(),
            key,
            values,
            negates,
            nesting_parent,
            chain: Some(head),
            members: Vec::new(),
            closed: false,
        }
    }

    /// The final Else branch of `head`'s chain.
    pub fn new_else(
        parent: FileId,
        head: LogicId,
        negates: Vec<(ScopeKey, Vec<String>)>,
        nesting_parent: Option<LogicId>,
    ) -> Self {
        Self {
            id: LogicId::new(),
            parent,
            kind: LogicKind::Else,
            raw_key: String::new(),
            key: None,
            values: Vec::new(),
            negates,
            nesting_parent,
            chain: Some(head),
            members: Vec::new(),
            closed: false,
        }
    }

    /// A Define block.
    pub fn new_define(
        parent: FileId,
        raw_key: impl Into<String>,
        key: Option<ScopeKey>,
        values: Vec<String>,
        nesting_parent: Option<LogicId>,
    ) -> Self {
        Self {
            id: LogicId::new(),
            parent,
            kind: LogicKind::Define,
            raw_key: raw_key.into(),
            key,
            values,
            negates: Vec::new(),
            nesting_parent,
            chain: None,
            members: Vec::new(),
            closed: false,
        }
    }

    pub fn id(&self) -> LogicId {
        self.id
    }

    pub fn parent(&self) -> FileId {
        self.parent
    }

    /// The chain-head block id (itself, for If/Define).
    pub fn chain_head(&self) -> LogicId {
        self.chain.unwrap_or(self.id)
    }

    pub fn members(&self) -> &[PartId] {
        &self.members
    }

    pub fn contains(&self, part: PartId) -> bool {
        self.members.contains(&part)
    }

    pub fn last_member(&self) -> Option<PartId> {
        self.members.last().copied()
    }

    /// Append a member part.
    pub fn add_member(&mut self, part: PartId) {
        self.members.push(part);
    }

    /// Insert a member adjacent to an existing one (appends when the
    /// anchor is not a member).
    pub fn add_member_after(&mut self, part: PartId, anchor: PartId) {
        match self.members.iter().position(|m| *m == anchor) {
            Some(i) => self.members.insert(i + 1, part),
            None => self.members.push(part),
        }
    }

    /// Remove a member; returns whether it was present. Removing the last
    /// member closes the block.
    pub fn remove_member(&mut self, part: PartId) -> bool {
        match self.members.iter().position(|m| *m == part) {
            Some(i) => {
                self.members.remove(i);
                if self.members.is_empty() {
                    self.closed = true;
                }
                true
            }
            None => false,
        }
    }

    /// Whether both markers have been seen (or the block emptied out).
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Evaluate this block against a scope.
    ///
    /// An empty scope matches everything; Define blocks always match; If
    /// branches match when any of their values is active under their key;
    /// Else matches the negation of every preceding sibling branch.
    pub fn matches(&self, scope: &Scope) -> bool {
        if scope.is_empty() {
            return true;
        }
        match self.kind {
            LogicKind::Define => true,
            LogicKind::If | LogicKind::ElseIf => {
                let Some(key) = self.key else {
                    return true;
                };
                self.values.iter().any(|v| scope.contains(key, v))
            }
            LogicKind::Else => !self
                .negates
                .iter()
                .any(|(key, values)| values.iter().any(|v| scope.contains(*key, v))),
        }
    }

    /// The opening marker line for this block, without indentation.
    pub fn open_line(&self) -> String {
        match self.kind {
            LogicKind::If => format!("If {} == {}", self.raw_key, self.values.join(" | ")),
            LogicKind::ElseIf => {
                format!("Else If {} == {}", self.raw_key, self.values.join(" | "))
            }
            LogicKind::Else => "Else".to_string(),
            LogicKind::Define => {
                format!("Define {} == {}", self.raw_key, self.values.join(" | "))
            }
        }
    }

    /// The closing marker line for this block's chain.
    pub fn end_line(&self) -> &'static str {
        match self.kind {
            LogicKind::Define => "End Define",
            _ => "End If",
        }
    }
}

/// Outcome of removing a part from a block: the anchor the caller should
/// relocate the part after, if the block still has members.
#[derive(Debug, Clone, Copy)]
pub struct PartRemoval {
    pub last_member: Option<PartId>,
}

/// Arena of logic blocks for one control-file aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicSet {
    blocks: Vec<LogicBlock>,
}

impl LogicSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogicBlock> {
        self.blocks.iter()
    }

    pub fn push(&mut self, block: LogicBlock) {
        self.blocks.push(block);
    }

    pub fn get(&self, id: LogicId) -> Option<&LogicBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: LogicId) -> Option<&mut LogicBlock> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    pub fn index_of(&self, id: LogicId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    pub fn remove(&mut self, id: LogicId) -> Option<LogicBlock> {
        self.index_of(id).map(|i| self.blocks.remove(i))
    }

    /// Splice blocks in at `at` (clamped to the end).
    pub fn insert_many(&mut self, at: usize, blocks: Vec<LogicBlock>) {
        let at = at.min(self.blocks.len());
        self.blocks.splice(at..at, blocks);
    }

    pub fn into_blocks(self) -> Vec<LogicBlock> {
        self.blocks
    }

    /// Remove a part from a block's membership.
    ///
    /// Returns the relocation anchor for the caller: the block's last
    /// remaining member, or `None` when the removal emptied (and closed)
    /// the block.
    pub fn remove_part(&mut self, id: LogicId, part: PartId) -> Option<PartRemoval> {
        let block = self.get_mut(id)?;
        if !block.remove_member(part) {
            return None;
        }
        Some(PartRemoval {
            last_member: block.last_member(),
        })
    }

    /// Drop closed blocks that no longer own any members.
    ///
    /// Blocks that surviving blocks still point at (a chain head whose Else
    /// keeps members, a nesting parent of a populated inner block) are kept
    /// even when emptied, so their marker lines can still be written.
    pub fn prune_closed(&mut self) {
        let mut keep: Vec<LogicId> = self
            .blocks
            .iter()
            .filter(|b| !(b.is_closed() && b.members.is_empty()))
            .map(|b| b.id)
            .collect();
        let mut i = 0;
        while i < keep.len() {
            if let Some(block) = self.get(keep[i]) {
                for id in [block.chain, block.nesting_parent].into_iter().flatten() {
                    if !keep.contains(&id) {
                        keep.push(id);
                    }
                }
            }
            i += 1;
        }
        self.blocks.retain(|b| keep.contains(&b.id));
    }

    /// Walk the nesting chain from a part's innermost block outward; every
    /// level must match the scope.
    pub fn in_scope(&self, innermost: Option<LogicId>, scope: &Scope) -> bool {
        let mut current = innermost;
        let mut guard = 0;
        while let Some(id) = current {
            guard += 1;
            if guard > 64 {
                tracing::warn!(%id, "logic nesting chain too deep; treating as out of scope");
                return false;
            }
            match self.get(id) {
                Some(block) => {
                    if !block.matches(scope) {
                        return false;
                    }
                    current = block.nesting_parent;
                }
                None => return true,
            }
        }
        true
    }
}
