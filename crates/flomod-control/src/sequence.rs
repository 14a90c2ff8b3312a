//! Ordered arena of parts with positional insertion and filtered queries.

use flomod_core::{PartId, Scope};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logic::LogicSet;
use crate::part::{KindFilter, Part};

/// Where to place a part relative to the existing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Directly after the anchor part.
    After(PartId),
    /// Directly before the anchor part.
    Before(PartId),
    /// After the last part that came from the same source file, or at the
    /// end when no such part exists.
    Default,
}

/// Query filter for [`PartSequence::fetch`].
///
/// `dedupe` keeps only the first occurrence of each command, except that a
/// suppressed duplicate's sibling continuations are retained alongside it.
#[derive(Debug, Clone, Copy)]
pub struct FetchFilter<'a> {
    pub kind: Option<KindFilter>,
    pub command: Option<&'a str>,
    pub dedupe: bool,
    pub scope: Option<&'a Scope>,
}

impl Default for FetchFilter<'_> {
    fn default() -> Self {
        Self {
            kind: None,
            command: None,
            dedupe: true,
            scope: None,
        }
    }
}

/// The ordered list of parts in document order across the aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartSequence {
    parts: Vec<Part>,
}

impl PartSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.parts.iter()
    }

    pub fn get(&self, id: PartId) -> Option<&Part> {
        self.parts.iter().find(|p| p.id() == id)
    }

    pub fn get_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts.iter_mut().find(|p| p.id() == id)
    }

    pub fn by_index(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    pub fn index_of(&self, id: PartId) -> Option<usize> {
        self.parts.iter().position(|p| p.id() == id)
    }

    pub fn contains(&self, id: PartId) -> bool {
        self.index_of(id).is_some()
    }

    /// Append without position or duplicate handling (loader path).
    pub(crate) fn push_raw(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// Insert a part at the given position, inheriting the anchor's logic
    /// association. Duplicate ids are an error.
    pub fn add(&mut self, part: Part, position: Position) -> Result<()> {
        self.add_opts(part, position, false)
    }

    /// [`add`](Self::add) with duplicate suppression: when `suppress_duplicate`
    /// is set, inserting an id already present is a no-op instead of an error.
    pub fn add_opts(&mut self, part: Part, position: Position, suppress_duplicate: bool) -> Result<()> {
        if self.contains(part.id()) {
            if suppress_duplicate {
                tracing::debug!(id = %part.id(), command = %part.command, "part already present; add suppressed");
                return Ok(());
            }
            return Err(Error::AlreadyExists {
                what: format!("part {}", part.id()),
            });
        }
        let mut part = part;
        match position {
            Position::After(anchor) => {
                let at = self.index_of(anchor).ok_or_else(|| Error::NotFound {
                    what: format!("anchor part {anchor}"),
                })?;
                part.logic = self.parts[at].logic;
                self.insert_at(at + 1, part);
            }
            Position::Before(anchor) => {
                let at = self.index_of(anchor).ok_or_else(|| Error::NotFound {
                    what: format!("anchor part {anchor}"),
                })?;
                part.logic = self.parts[at].logic;
                self.insert_at(at, part);
            }
            Position::Default => {
                let at = self
                    .parts
                    .iter()
                    .rposition(|p| p.parent() == part.parent())
                    .map(|i| i + 1)
                    .unwrap_or(self.parts.len());
                self.insert_at(at, part);
            }
        }
        Ok(())
    }

    /// Remove a part, returning it. Sibling links of neighbours are healed.
    pub fn remove(&mut self, id: PartId) -> Result<Part> {
        let at = self.index_of(id).ok_or_else(|| Error::NotFound {
            what: format!("part {id}"),
        })?;
        let removed = self.parts.remove(at);
        if let Some(prev) = removed.sibling_prev
            && let Some(p) = self.get_mut(prev)
        {
            p.sibling_next = removed.sibling_next;
        }
        if let Some(next) = removed.sibling_next
            && let Some(n) = self.get_mut(next)
        {
            n.sibling_prev = removed.sibling_prev;
        }
        Ok(removed)
    }

    /// Replace a part in place; the replacement inherits the old part's
    /// logic association. Returns the displaced part.
    pub fn replace(&mut self, old: PartId, mut new: Part) -> Result<Part> {
        if self.contains(new.id()) {
            return Err(Error::AlreadyExists {
                what: format!("part {}", new.id()),
            });
        }
        let at = self.index_of(old).ok_or_else(|| Error::NotFound {
            what: format!("part {old}"),
        })?;
        new.logic = self.parts[at].logic;
        Ok(std::mem::replace(&mut self.parts[at], new))
    }

    /// Move an existing part next to an anchor. The part keeps its own
    /// logic association but leaves any pipe-joined sibling chain behind
    /// and renders standalone at its new position.
    pub fn move_part(&mut self, id: PartId, position: Position) -> Result<()> {
        let anchor = match position {
            Position::After(a) | Position::Before(a) => a,
            Position::Default => {
                return Err(Error::InvalidArgument {
                    message: "move requires an explicit anchor".to_string(),
                });
            }
        };
        if anchor == id {
            return Err(Error::InvalidArgument {
                message: "cannot move a part relative to itself".to_string(),
            });
        }
        if !self.contains(anchor) {
            return Err(Error::NotFound {
                what: format!("anchor part {anchor}"),
            });
        }
        let mut part = self.remove(id)?;
        // The removal healed the neighbours' links; the moved part must not
        // keep pointing back into the chain it left.
        part.sibling_prev = None;
        part.sibling_next = None;
        // Anchor index is recomputed after the removal shifted the tail.
        let at = self.index_of(anchor).ok_or_else(|| Error::NotFound {
            what: format!("anchor part {anchor}"),
        })?;
        match position {
            Position::After(_) => self.insert_at(at + 1, part),
            Position::Before(_) => self.insert_at(at, part),
            Position::Default => unreachable!(),
        }
        Ok(())
    }

    /// Splice a run of parts in at `at` (clamped to the end).
    pub fn insert_many(&mut self, at: usize, parts: Vec<Part>) {
        let at = at.min(self.parts.len());
        self.parts.splice(at..at, parts);
    }

    pub(crate) fn insert_at(&mut self, at: usize, part: Part) {
        if at >= self.parts.len() {
            self.parts.push(part);
        } else {
            self.parts.insert(at, part);
        }
    }

    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }

    /// Document-order query over file and variable parts.
    ///
    /// Unknown parts never match. With `dedupe`, a command already seen is
    /// skipped unless it continues the sibling chain of a part that was
    /// kept or skipped immediately before it.
    pub fn fetch(&self, filter: FetchFilter<'_>, logic: &LogicSet) -> Vec<&Part> {
        let mut seen: Vec<String> = Vec::new();
        let mut fetch_sibling = false;
        let mut out = Vec::new();
        for part in &self.parts {
            let kind_ok = match filter.kind {
                Some(f) => part.matches_filter(f),
                None => part.is_file() || part.is_variable(),
            };
            if !kind_ok {
                continue;
            }
            if let Some(command) = filter.command
                && !part.command.eq_ignore_ascii_case(command)
            {
                continue;
            }
            if let Some(scope) = filter.scope
                && !logic.in_scope(part.logic, scope)
            {
                continue;
            }
            if filter.dedupe {
                let key = part.command.to_uppercase();
                if seen.contains(&key) {
                    if !fetch_sibling || part.sibling_prev.is_none() {
                        fetch_sibling = part.sibling_next.is_some();
                        continue;
                    }
                } else {
                    seen.push(key);
                }
                fetch_sibling = part.sibling_next.is_some();
            }
            out.push(part);
        }
        out
    }
}

impl std::ops::Index<usize> for PartSequence {
    type Output = Part;

    fn index(&self, index: usize) -> &Part {
        &self.parts[index]
    }
}

impl<'a> IntoIterator for &'a PartSequence {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flomod_core::{FileId, PathInfo};
    use pretty_assertions::assert_eq;

    fn variable(parent: FileId, command: &str, value: &str) -> Part {
        Part::new_variable(parent, command, value)
    }

    fn commands(parts: &[&Part]) -> Vec<String> {
        parts.iter().map(|p| p.command.clone()).collect()
    }

    #[test]
    fn default_position_groups_by_source_file() {
        let file_a = FileId::new();
        let file_b = FileId::new();
        let mut seq = PartSequence::new();
        seq.add(variable(file_a, "A1", "1"), Position::Default).unwrap();
        seq.add(variable(file_b, "B1", "1"), Position::Default).unwrap();
        seq.add(variable(file_a, "A2", "2"), Position::Default).unwrap();

        let order: Vec<String> = seq.iter().map(|p| p.command.clone()).collect();
        assert_eq!(order, vec!["A1", "A2", "B1"]);
    }

    #[test]
    fn after_and_before_inherit_anchor_logic() {
        let file = FileId::new();
        let logic = flomod_core::LogicId::new();
        let mut seq = PartSequence::new();
        let mut anchor = variable(file, "Anchor", "1");
        anchor.logic = Some(logic);
        let anchor_id = anchor.id();
        seq.add(anchor, Position::Default).unwrap();

        let after = variable(file, "After", "2");
        let after_id = after.id();
        seq.add(after, Position::After(anchor_id)).unwrap();
        assert_eq!(seq.get(after_id).unwrap().logic, Some(logic));
        assert_eq!(seq.index_of(after_id), Some(1));

        let before = variable(file, "Before", "3");
        let before_id = before.id();
        seq.add(before, Position::Before(anchor_id)).unwrap();
        assert_eq!(seq.get(before_id).unwrap().logic, Some(logic));
        assert_eq!(seq.index_of(before_id), Some(0));
    }

    #[test]
    fn duplicate_add_is_an_error_unless_suppressed() {
        let file = FileId::new();
        let mut seq = PartSequence::new();
        let part = variable(file, "X", "1");
        let copy = part.clone();
        seq.add(part, Position::Default).unwrap();

        assert!(matches!(
            seq.add(copy.clone(), Position::Default),
            Err(Error::AlreadyExists { .. })
        ));
        seq.add_opts(copy, Position::Default, true).unwrap();
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn remove_heals_sibling_links() {
        let file = FileId::new();
        let mut a = Part::new_file(file, "Read GIS", PathInfo::new("", "a.shp"));
        let mut b = Part::new_file(file, "Read GIS", PathInfo::new("", "b.shp"));
        let mut c = Part::new_file(file, "Read GIS", PathInfo::new("", "c.shp"));
        let (ia, ib, ic) = (a.id(), b.id(), c.id());
        a.sibling_next = Some(ib);
        b.sibling_prev = Some(ia);
        b.sibling_next = Some(ic);
        c.sibling_prev = Some(ib);

        let mut seq = PartSequence::new();
        for part in [a, b, c] {
            seq.push_raw(part);
        }
        seq.remove(ib).unwrap();
        assert_eq!(seq.get(ia).unwrap().sibling_next, Some(ic));
        assert_eq!(seq.get(ic).unwrap().sibling_prev, Some(ia));
    }

    #[test]
    fn move_part_detaches_it_from_its_sibling_chain() {
        let file = FileId::new();
        let mut a = Part::new_file(file, "Read GIS", PathInfo::new("", "a.shp"));
        let mut b = Part::new_file(file, "Read GIS", PathInfo::new("", "b.shp"));
        let (ia, ib) = (a.id(), b.id());
        a.sibling_next = Some(ib);
        b.sibling_prev = Some(ia);

        let mut seq = PartSequence::new();
        seq.push_raw(a);
        seq.push_raw(b);
        let anchor = variable(file, "Cell Size", "5");
        let anchor_id = anchor.id();
        seq.push_raw(anchor);

        seq.move_part(ib, Position::After(anchor_id)).unwrap();
        let moved = seq.get(ib).unwrap();
        assert_eq!(moved.sibling_prev, None);
        assert_eq!(moved.sibling_next, None);
        assert_eq!(seq.get(ia).unwrap().sibling_next, None);
        // Standalone now: its line no longer joins onto the previous part's.
        assert!(!moved.format_line().1);
    }

    #[test]
    fn replace_keeps_position_and_logic() {
        let file = FileId::new();
        let logic = flomod_core::LogicId::new();
        let mut seq = PartSequence::new();
        seq.add(variable(file, "First", "1"), Position::Default).unwrap();
        let mut old = variable(file, "Old", "2");
        old.logic = Some(logic);
        let old_id = old.id();
        seq.add(old, Position::Default).unwrap();

        let new = variable(file, "New", "3");
        let new_id = new.id();
        let displaced = seq.replace(old_id, new).unwrap();
        assert_eq!(displaced.command, "Old");
        assert_eq!(seq.index_of(new_id), Some(1));
        assert_eq!(seq.get(new_id).unwrap().logic, Some(logic));
    }

    #[test]
    fn move_part_requires_an_anchor() {
        let file = FileId::new();
        let mut seq = PartSequence::new();
        let a = variable(file, "A", "1");
        let b = variable(file, "B", "2");
        let (ia, ib) = (a.id(), b.id());
        seq.add(a, Position::Default).unwrap();
        seq.add(b, Position::Default).unwrap();

        assert!(matches!(
            seq.move_part(ia, Position::Default),
            Err(Error::InvalidArgument { .. })
        ));
        seq.move_part(ia, Position::After(ib)).unwrap();
        let order: Vec<String> = seq.iter().map(|p| p.command.clone()).collect();
        assert_eq!(order, vec!["B", "A"]);
    }

    #[test]
    fn fetch_dedupes_but_keeps_sibling_continuations() {
        let file = FileId::new();
        let mut first = Part::new_file(file, "Read GIS", PathInfo::new("", "a.shp"));
        let mut second = Part::new_file(file, "Read GIS", PathInfo::new("", "b.shp"));
        first.sibling_next = Some(second.id());
        second.sibling_prev = Some(first.id());
        let third = Part::new_file(file, "Read GIS", PathInfo::new("", "c.shp"));

        let mut seq = PartSequence::new();
        let first_id = first.id();
        let second_id = second.id();
        for part in [first, second, third] {
            seq.push_raw(part);
        }

        let logic = LogicSet::new();
        let found = seq.fetch(
            FetchFilter {
                kind: Some(KindFilter::File),
                ..FetchFilter::default()
            },
            &logic,
        );
        let ids: Vec<_> = found.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![first_id, second_id]);

        let all = seq.fetch(
            FetchFilter {
                kind: Some(KindFilter::File),
                dedupe: false,
                ..FetchFilter::default()
            },
            &logic,
        );
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn fetch_filters_by_command_and_kind() {
        let file = FileId::new();
        let mut seq = PartSequence::new();
        seq.push_raw(variable(file, "Cell Size", "2.5"));
        seq.push_raw(Part::new_file(file, "Read GIS", PathInfo::new("", "a.shp")));
        seq.push_raw(Part::new_unknown(file, "! comment"));

        let logic = LogicSet::new();
        let vars = seq.fetch(
            FetchFilter {
                kind: Some(KindFilter::Variable),
                ..FetchFilter::default()
            },
            &logic,
        );
        assert_eq!(commands(&vars), vec!["Cell Size"]);

        let named = seq.fetch(
            FetchFilter {
                command: Some("read gis"),
                ..FetchFilter::default()
            },
            &logic,
        );
        assert_eq!(commands(&named), vec!["Read GIS"]);

        let everything = seq.fetch(FetchFilter::default(), &logic);
        assert_eq!(everything.len(), 2);
    }
}
