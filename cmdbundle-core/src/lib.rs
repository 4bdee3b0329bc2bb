//! # cmdbundle: command bundle interpreter
//!
//! A bundle is a named list of raw directive strings. Invoking it for an
//! actor expands every directive into side effects on the hosting server:
//! dispatched commands, chat messages, host processes, webhook calls and
//! variable updates, subject to delays, conditions, random picks and loops.
//!
//! ## Processing Pipeline
//!
//! ```text
//! raw action → Directive Parser → Random Collapse → Scheduler
//!            → Condition Gate → Placeholder Resolver → Sink
//! ```
//!
//! - Directive parsing ([`directive`]) strips `[marker:...]` sections and
//!   single-character prefixes into a [`directive::Directive`].
//! - Evaluation ([`eval`]) covers `{math:...}` expressions, `[if:...]`
//!   conditions and dotted JSON lookups on stored variables.
//! - Resolution ([`resolver`]) runs the ordered placeholder passes against
//!   the actor, the [`store::VariableStore`] and the host.
//! - Execution ([`runtime`]) schedules delayed directives and hands each one
//!   to its sink.
//!
//! ## Host Integration
//!
//! Everything the engine needs from the server is behind the traits in
//! [`host`]. Shell, HTTP and local-file implementations are provided; the
//! [`host::ServerHost`] side is always supplied by the embedder.

pub mod actor;
pub mod bundle;
pub mod config;
pub mod directive;
pub mod error;
pub mod eval;
pub mod host;
pub mod resolver;
pub mod runtime;
pub mod store;
pub mod styled;

// Re-exports
pub use actor::{Actor, ActorId, ActorSnapshot, Team};
pub use bundle::{Bundle, BundleCatalog};
pub use config::EngineConfig;
pub use error::*;
pub use runtime::{BundleExecutor, InvocationHandle};
pub use store::VariableStore;
pub use styled::{Decoration, StyledText, TextColor};
