#![warn(missing_docs)]
//! Jump Core - headless keyboard jump and multi-point edit engine
//!
//! # Overview
//!
//! `jump-core` lets a user move and edit by typing short queries: jump to a word, character
//! or line through generated shortcut tags, jump through incremental search, replace many
//! matches at once, and run multicursor batch edits. It never owns the document; everything
//! goes through a [`HostEditor`] implementation.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Dispatcher (commands, key/pointer events)  │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Session (marks, subscriptions, teardown)   │  ← Resource ownership
//! ├──────────────────────┬──────────────────────┤
//! │  Overlay Renderer    │  Transaction Engine  │  ← Reversible buffers
//! ├──────────────────────┼──────────────────────┤
//! │  Tag Generator       │  Filter / Multi-point│  ← Selection
//! ├──────────────────────┴──────────────────────┤
//! │  Match Index                                │  ← Candidate spans
//! └─────────────────────────────────────────────┘
//! ```
//!
//! All positions are byte offsets into the UTF-8 document.
//!
//! # Quick Start
//!
//! ```rust
//! use jump_core::{Dispatcher, HostEditor, Key, MemoryHost, Mode, Scope, Settings};
//!
//! let mut host = MemoryHost::new("alpha beta gamma");
//! let mut dispatcher = Dispatcher::new(Settings::default());
//!
//! dispatcher.tag_words(&mut host, Scope::Range(0..16)).unwrap();
//! assert_eq!(dispatcher.mode(), Mode::TaggingWord);
//! assert_eq!(host.text(), "a     b    c    ");
//!
//! // Typing the tag jumps there and restores the text.
//! dispatcher.on_key(&mut host, Key::Char('b'));
//! assert_eq!(host.text(), "alpha beta gamma");
//! assert_eq!(host.get_cursor(), 6);
//! ```

pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod host;
pub mod index;
pub mod memory;
pub mod multicursor;
pub mod overlay;
pub mod selection;
pub mod session;
pub mod span;
pub mod tags;
pub mod transaction;

pub use dispatcher::{Dispatcher, Key, KeyResponse, PointerEvent, Scope};
pub use error::JumpError;
pub use filter::{CaseRule, FilterOutcome, FilterState, text_matches, valid_smart_case};
pub use host::{HostEditor, HostError, LifecycleEvent, MarkKind, SubscriptionHandle};
pub use index::{ScanOptions, is_word_char, scan, scan_range};
pub use memory::{Mark, MemoryHost};
pub use overlay::{LedgerEntry, LineFeedLedger, OverlayBuffer, OverlayOptions, TagPlacement};
pub use selection::{AddOutcome, MultiPointSet};
pub use session::{Mode, ReplaceKind, SearchKind};
pub use span::{CandidateSpan, Granularity};
pub use tags::{TagInputOutcome, TagScheme};
pub use transaction::{BackspaceOutcome, EditRecord, Transaction, TransactionBuffer};

pub use jump_core_config::{
    AfterJump, ConfigError, JumpSettings, MatchPolicy, ReplaceAction, ReplaceSettings,
    SearchSettings, Settings, TagSettings,
};
