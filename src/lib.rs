//! # docdiff-nvim
//!
//! A Neovim plugin for comparing two versions of a document at line and word
//! granularity.
//!
//! Lines are aligned with a longest-matching-block matcher; changed blocks are then
//! refined word by word so a reader sees exactly which words moved. Alongside the
//! side-by-side segments, a classic unified diff is produced, and an optional
//! summarizer condenses that diff into a short prose synopsis.
//!
//! ## Architecture
//!
//! - `align` - Line/word alignment into opcodes (longest matching blocks)
//! - `refine` - Word-level refinement of a changed block into highlighted spans
//! - `segment` - Display segments built from line opcodes
//! - `unified` - Unified-diff text with three lines of context
//! - `render` - Marked-string and HTML table rendering of segments
//! - `summary` - Best-effort prose summary through a chat-completion endpoint
//! - `ingest` - Text extraction from plain-text and `.docx` documents
//! - `compare` - Orchestration of all of the above for one or many document pairs
//! - `lua` - Lua bindings (behind the `lua` feature)
//!
//! ## Usage from Lua
//!
//! ```lua
//! local docdiff = require("docdiff_nvim")
//!
//! -- Compare two strings
//! local result = docdiff.compare("The cat sat", "The dog sat")
//!
//! -- Compare two files and ask for a summary
//! local result = docdiff.compare_files("v1.docx", "v2.docx", { summarize = true })
//!
//! -- Compare many pairs in parallel
//! local results = docdiff.compare_many({ { "a", "b" }, { "c", "d" } })
//! ```
//!
//! ## Environment Variables
//!
//! The summarizer reads its settings from the environment unless they are passed
//! in the options table:
//!
//! - `HUGGINGFACE_API_KEY` - Bearer token for the summary endpoint
//! - `DOCDIFF_SUMMARY_ENDPOINT` - Chat-completion URL
//! - `DOCDIFF_SUMMARY_MODEL` - Model name
//! - `DOCDIFF_SUMMARY_MAX_TOKENS` - Completion length cap

pub mod align;
pub mod compare;
pub mod ingest;
pub mod refine;
pub mod render;
pub mod segment;
pub mod summary;
pub mod unified;

#[cfg(feature = "lua")]
mod lua;

pub use align::{Matcher, Opcode, Tag, opcodes};
pub use compare::{CompareError, Comparison, compare, compare_many, validate_inputs};
pub use ingest::{DocumentKind, IngestError, extract_text, read_document};
pub use refine::refine;
pub use segment::{DiffSegment, SegmentError, Side, Span, segments};
pub use summary::{
    ChatSummarizer, Summarizer, SummarizerConfig, SummarizerOverrides, SummaryError,
};
pub use unified::unified_diff;
