//! Line parser for control files.
//!
//! Each line becomes a [`Part`]; `If`/`Else If`/`Else`/`Define` markers open
//! and close [`LogicBlock`]s instead of becoming parts themselves. The
//! parser is lenient: malformed markers are reported through `tracing` and
//! the line is carried verbatim rather than aborting the load.

use std::path::Path;
use std::sync::LazyLock;

use flomod_core::{FileId, LogicId, PartId, PathInfo, ScopeKey};
use regex::Regex;

use crate::error::Result;
use crate::logic::{LogicBlock, LogicSet};
use crate::part::Part;
use crate::sequence::PartSequence;

static IF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*if\s+(.+?)\s*==\s*(.+?)\s*$").unwrap());
static ELSE_IF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*else\s+if\s+(.+?)\s*==\s*(.+?)\s*$").unwrap());
static ELSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*else\s*$").unwrap());
static END_IF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*end\s*if\s*$").unwrap());
static DEFINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*define\s+(.+?)\s*==\s*(.+?)\s*$").unwrap());
static END_DEFINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*end\s*define\s*$").unwrap());
static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.+?)\s*==\s*(.+?)\s*$").unwrap());

/// The parts and logic blocks recovered from one source file.
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub parts: PartSequence,
    pub logic: LogicSet,
}

/// Whether a command's right-hand side names a file rather than a value.
pub(crate) fn is_file_command(command: &str) -> bool {
    let upper = command.to_uppercase();
    upper.starts_with("READ ")
        || upper == "READ FILE"
        || upper.ends_with("CONTROL FILE")
        || upper == "BC DATABASE"
        || upper == "EVENT FILE"
}

fn scope_key_for(raw_key: &str) -> Option<ScopeKey> {
    if raw_key.eq_ignore_ascii_case("scenario") {
        Some(ScopeKey::Scenario)
    } else if raw_key.eq_ignore_ascii_case("event") {
        Some(ScopeKey::Event)
    } else {
        None
    }
}

fn split_values(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Conditions accumulated by a chain so far, for an Else branch to negate.
fn negates_after(block: &LogicBlock) -> Vec<(ScopeKey, Vec<String>)> {
    let mut negates = block.negates.clone();
    if let Some(key) = block.key {
        negates.push((key, block.values.clone()));
    }
    negates
}

/// Close the innermost open branch ahead of an `Else If`/`Else` marker,
/// returning what the continuation inherits from it.
#[allow(clippy::type_complexity)]
fn close_branch(
    logic: &mut LogicSet,
    stack: &mut Vec<LogicId>,
) -> Option<(Vec<(ScopeKey, Vec<String>)>, LogicId, Option<LogicId>)> {
    let top = stack.pop()?;
    let block = logic.get_mut(top)?;
    block.close();
    Some((negates_after(block), block.chain_head(), block.nesting_parent))
}

/// Parse the lines of one control file.
///
/// `file_id` identifies the source file and `root` is the directory the
/// file lives in; relative paths on file commands resolve against it.
pub fn parse_lines(lines: &[String], file_id: FileId, root: &Path) -> Result<ParsedFile> {
    let mut out = ParsedFile::default();
    let mut stack: Vec<LogicId> = Vec::new();

    for (line_no, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if END_IF_RE.is_match(trimmed) || END_DEFINE_RE.is_match(trimmed) {
            match stack.pop() {
                Some(top) => {
                    if let Some(block) = out.logic.get_mut(top) {
                        block.close();
                    }
                }
                None => {
                    tracing::warn!(line = line_no + 1, text = %trimmed, "unmatched end marker ignored");
                }
            }
            continue;
        }

        if let Some(caps) = ELSE_IF_RE.captures(trimmed) {
            match close_branch(&mut out.logic, &mut stack) {
                Some((negates, head, nesting_parent)) => {
                    let raw_key = caps[1].to_string();
                    let block = LogicBlock::new_else_if(
                        file_id,
                        &raw_key,
                        scope_key_for(&raw_key),
                        split_values(&caps[2]),
                        head,
                        negates,
                        nesting_parent,
                    );
                    stack.push(block.id());
                    out.logic.push(block);
                }
                None => {
                    tracing::warn!(line = line_no + 1, text = %trimmed, "Else If without an open If; line kept verbatim");
                    push_part(&mut out, &stack, Part::new_unknown(file_id, trimmed));
                }
            }
            continue;
        }

        if ELSE_RE.is_match(trimmed) {
            match close_branch(&mut out.logic, &mut stack) {
                Some((negates, head, nesting_parent)) => {
                    let block = LogicBlock::new_else(file_id, head, negates, nesting_parent);
                    stack.push(block.id());
                    out.logic.push(block);
                }
                None => {
                    tracing::warn!(line = line_no + 1, "Else without an open If; line kept verbatim");
                    push_part(&mut out, &stack, Part::new_unknown(file_id, trimmed));
                }
            }
            continue;
        }

        if let Some(caps) = IF_RE.captures(trimmed) {
            let raw_key = caps[1].to_string();
            let block = LogicBlock::new_if(
                file_id,
                &raw_key,
                scope_key_for(&raw_key),
                split_values(&caps[2]),
                stack.last().copied(),
            );
            stack.push(block.id());
            out.logic.push(block);
            continue;
        }

        if let Some(caps) = DEFINE_RE.captures(trimmed) {
            let raw_key = caps[1].to_string();
            let block = LogicBlock::new_define(
                file_id,
                &raw_key,
                scope_key_for(&raw_key),
                split_values(&caps[2]),
                stack.last().copied(),
            );
            stack.push(block.id());
            out.logic.push(block);
            continue;
        }

        if trimmed.is_empty() || trimmed.starts_with('!') || trimmed.starts_with('#') {
            push_part(&mut out, &stack, Part::new_unknown(file_id, trimmed));
            continue;
        }

        if let Some(caps) = COMMAND_RE.captures(trimmed) {
            let command = caps[1].to_string();
            let value = caps[2].to_string();
            if is_file_command(&command) {
                push_file_parts(&mut out, &stack, file_id, root, &command, &value, line_no);
            } else {
                push_part(
                    &mut out,
                    &stack,
                    Part::new_variable(file_id, command, value),
                );
            }
            continue;
        }

        push_part(&mut out, &stack, Part::new_unknown(file_id, trimmed));
    }

    for top in stack.drain(..).rev() {
        if let Some(block) = out.logic.get_mut(top) {
            tracing::warn!(marker = %block.open_line(), "unterminated block closed at end of file");
            block.close();
        }
    }

    Ok(out)
}

fn push_part(out: &mut ParsedFile, stack: &[LogicId], mut part: Part) {
    if let Some(top) = stack.last() {
        part.logic = Some(*top);
        if let Some(block) = out.logic.get_mut(*top) {
            block.add_member(part.id());
        }
    }
    out.parts.push_raw(part);
}

/// A file command; the value may be a `|`-separated run of sibling paths
/// and may carry a trailing `!`/`#` comment, which is dropped.
fn push_file_parts(
    out: &mut ParsedFile,
    stack: &[LogicId],
    file_id: FileId,
    root: &Path,
    command: &str,
    value: &str,
    line_no: usize,
) {
    let value = match value.find(['!', '#']) {
        Some(at) => {
            tracing::debug!(line = line_no + 1, "dropping inline comment on file command");
            value[..at].trim_end()
        }
        None => value,
    };
    let paths = split_values(value);
    if paths.is_empty() {
        tracing::warn!(line = line_no + 1, command, "file command with empty path kept verbatim");
        push_part(out, stack, Part::new_unknown(file_id, format!("{command} == {value}")));
        return;
    }

    let mut previous: Option<PartId> = None;
    for path in paths {
        let mut part = Part::new_file(file_id, command, PathInfo::new(root, path));
        part.sibling_prev = previous;
        let id = part.id();
        if let Some(prev) = previous
            && let Some(p) = out.parts.get_mut(prev)
        {
            p.sibling_next = Some(id);
        }
        push_part(out, stack, part);
        previous = Some(id);
    }
}
