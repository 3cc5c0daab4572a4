//! Lua bindings.
//!
//! Exposes the comparison to Neovim as the `docdiff_nvim` module. Results are
//! plain Lua tables; errors raised here (empty input, unreadable files) surface as
//! Lua errors, while summary failures are folded into the `summary` string.

use crate::align::{Tag, opcodes};
use crate::compare::{Comparison, compare, compare_many, validate_inputs};
use crate::ingest::read_document;
use crate::refine::refine;
use crate::render::{Mark, marked_table_html, table_html};
use crate::segment::{DiffSegment, MarkedSegment, Side, Span, segments, split_lines};
use crate::summary::{ChatSummarizer, Summarizer, SummarizerConfig, SummarizerOverrides};
use crate::unified::unified_diff;
use mlua::prelude::*;
use serde::Deserialize;
use std::path::Path;

/// Options accepted as the last argument of `compare`, `compare_files` and
/// `compare_many`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompareOptions {
    /// Ask the summary endpoint for a synopsis.
    summarize: bool,

    /// Summary endpoint settings laid over the environment.
    summary: SummarizerOverrides,
}

impl CompareOptions {
    fn from_lua(lua: &Lua, table: Option<LuaTable>) -> LuaResult<Self> {
        match table {
            Some(table) => lua.from_value(LuaValue::Table(table)),
            None => Ok(Self::default()),
        }
    }

    /// Builds the summarizer these options ask for, if any.
    fn summarizer(self) -> Option<ChatSummarizer> {
        if !self.summarize {
            return None;
        }
        let config = SummarizerConfig::from_env().with_overrides(self.summary);
        Some(ChatSummarizer::new(config))
    }
}

impl IntoLua for Span {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;
        table.set("text", self.text)?;
        table.set("changed", self.changed)?;
        Ok(LuaValue::Table(table))
    }
}

impl IntoLua for Side {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let spans: Vec<LuaValue> = self
            .spans
            .into_iter()
            .map(|s| s.into_lua(lua))
            .collect::<LuaResult<_>>()?;
        Ok(LuaValue::Table(lua.create_sequence_from(spans)?))
    }
}

impl IntoLua for DiffSegment {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let marked = self.to_marked();
        let table = lua.create_table()?;
        table.set("type", marked.kind)?;
        table.set("original", marked.original)?;
        table.set("modified", marked.modified)?;
        table.set("original_spans", self.original.into_lua(lua)?)?;
        table.set("modified_spans", self.modified.into_lua(lua)?)?;
        Ok(LuaValue::Table(table))
    }
}

impl IntoLua for Comparison {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;
        table.set("diff", self.diff)?;
        table.set("summary", self.summary)?;

        let segments: Vec<LuaValue> = self
            .segments
            .into_iter()
            .map(|s| s.into_lua(lua))
            .collect::<LuaResult<_>>()?;
        table.set("json_diff", lua.create_sequence_from(segments)?)?;

        Ok(LuaValue::Table(table))
    }
}

/// Compares two strings.
fn compare_texts(
    lua: &Lua,
    (text_a, text_b, opts): (String, String, Option<LuaTable>),
) -> LuaResult<LuaValue> {
    validate_inputs(&text_a, &text_b).map_err(LuaError::external)?;
    let summarizer = CompareOptions::from_lua(lua, opts)?.summarizer();
    let summarizer = summarizer.as_ref().map(|s| s as &dyn Summarizer);
    compare(&text_a, &text_b, summarizer).into_lua(lua)
}

/// Reads two documents (plain text or `.docx`) and compares them.
fn compare_files(
    lua: &Lua,
    (path_a, path_b, opts): (String, String, Option<LuaTable>),
) -> LuaResult<LuaValue> {
    let (text_a, text_b) = rayon::join(
        || read_document(Path::new(&path_a)),
        || read_document(Path::new(&path_b)),
    );
    let text_a = text_a.map_err(LuaError::external)?;
    let text_b = text_b.map_err(LuaError::external)?;
    compare_texts(lua, (text_a, text_b, opts))
}

/// Compares a list of `{text_a, text_b}` pairs in parallel.
fn compare_pairs(
    lua: &Lua,
    (pairs, opts): (Vec<LuaTable>, Option<LuaTable>),
) -> LuaResult<LuaTable> {
    let pairs: Vec<(String, String)> = pairs
        .into_iter()
        .map(|pair| Ok((pair.get::<String>(1)?, pair.get::<String>(2)?)))
        .collect::<LuaResult<_>>()?;
    for (text_a, text_b) in &pairs {
        validate_inputs(text_a, text_b).map_err(LuaError::external)?;
    }

    let summarizer = CompareOptions::from_lua(lua, opts)?.summarizer();
    let summarizer = summarizer.as_ref().map(|s| s as &dyn Summarizer);
    let results: Vec<LuaValue> = compare_many(&pairs, summarizer)
        .into_iter()
        .map(|c| c.into_lua(lua))
        .collect::<LuaResult<_>>()?;
    lua.create_sequence_from(results)
}

/// Word-level view of two whole texts: `{ original = ..., modified = ... }`.
fn word_diff(lua: &Lua, (text_a, text_b): (String, String)) -> LuaResult<LuaTable> {
    let (original, modified) = refine(&text_a, &text_b);
    let table = lua.create_table()?;
    table.set("original", original.marked(Mark::Deleted))?;
    table.set("modified", modified.marked(Mark::Added))?;
    table.set("original_spans", original.into_lua(lua)?)?;
    table.set("modified_spans", modified.into_lua(lua)?)?;
    Ok(table)
}

/// Line opcodes as `{ tag, i1, i2, j1, j2 }` tables with 0-based half-open ranges.
fn line_opcodes(lua: &Lua, (text_a, text_b): (String, String)) -> LuaResult<LuaTable> {
    let a_lines = split_lines(&text_a);
    let b_lines = split_lines(&text_b);
    let ops: Vec<LuaTable> = opcodes(&a_lines, &b_lines)
        .into_iter()
        .map(|op| {
            let table = lua.create_table()?;
            table.set("tag", op.tag.as_str())?;
            table.set("i1", op.i1)?;
            table.set("i2", op.i2)?;
            table.set("j1", op.j1)?;
            table.set("j2", op.j2)?;
            Ok(table)
        })
        .collect::<LuaResult<_>>()?;
    lua.create_sequence_from(ops)
}

/// Renders a `json_diff` list (`{ type, original, modified }` tables) as HTML.
fn render_marked(_: &Lua, rows: Vec<LuaTable>) -> LuaResult<String> {
    let segments: Vec<MarkedSegment> = rows
        .into_iter()
        .map(|row| {
            let name: String = row.get("type")?;
            let kind = Tag::from_name(&name)
                .ok_or_else(|| LuaError::RuntimeError(format!("unknown segment type '{name}'")))?;
            Ok(MarkedSegment {
                kind: kind.as_str(),
                original: row.get("original")?,
                modified: row.get("modified")?,
            })
        })
        .collect::<LuaResult<_>>()?;
    Ok(marked_table_html(&segments))
}

/// Creates the Lua module exports. Called by mlua when loaded via `require("docdiff_nvim")`.
#[mlua::lua_module]
fn docdiff_nvim(lua: &Lua) -> LuaResult<LuaTable> {
    let exports = lua.create_table()?;
    exports.set(
        "compare",
        lua.create_function(|lua, args: (String, String, Option<LuaTable>)| {
            compare_texts(lua, args)
        })?,
    )?;
    exports.set(
        "compare_files",
        lua.create_function(|lua, args: (String, String, Option<LuaTable>)| {
            compare_files(lua, args)
        })?,
    )?;
    exports.set(
        "compare_many",
        lua.create_function(|lua, args: (Vec<LuaTable>, Option<LuaTable>)| {
            compare_pairs(lua, args)
        })?,
    )?;
    exports.set(
        "word_diff",
        lua.create_function(|lua, args: (String, String)| word_diff(lua, args))?,
    )?;
    exports.set(
        "opcodes",
        lua.create_function(|lua, args: (String, String)| line_opcodes(lua, args))?,
    )?;
    exports.set(
        "unified_diff",
        lua.create_function(|_, (a, b): (String, String)| Ok(unified_diff(&a, &b)))?,
    )?;
    exports.set(
        "render_table",
        lua.create_function(|_, (a, b): (String, String)| {
            let segs: Vec<_> = segments(&a, &b).collect();
            Ok(table_html(&segs))
        })?,
    )?;
    exports.set(
        "render_marked_table",
        lua.create_function(|lua, rows: Vec<LuaTable>| render_marked(lua, rows))?,
    )?;
    Ok(exports)
}
