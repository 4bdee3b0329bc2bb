//! Directive parsing.
//!
//! A bundle action is a plain string carrying an optional set of bracket
//! markers and single-character prefixes:
//!
//! ```text
//! [foreach:list:var] [delay:N] [if:cond] | [else if:cond] | [else] [random:W]
//!   /? (#message[@target]:style:text | !? -? (+name[~]:value | -? ($cmd [>>var] | %webhook | command)))
//! ```
//!
//! [`parse_directive`] turns one such string into a [`Directive`]; the
//! webhook body grammar lives in [`webhook`].

pub mod parser;
pub mod webhook;

pub use parser::{DEFAULT_RANDOM_WEIGHT, Directive, DirectiveKind, parse_directive};
pub use webhook::WebhookSpec;
