//! Generation agents for Themeloom.
//!
//! Requests flow `Orchestrator → agent → skills (+ optional model runner)`:
//!
//! 1. The [`Orchestrator`] parses the request kind, validates the payload,
//!    and hands a typed request to exactly one agent.
//! 2. The [`ThemeAgent`] builds themes from templates, trends and the
//!    preference profile, optionally asking a model for each item.
//! 3. The [`PostWriterAgent`] fills one caption template per language,
//!    optionally letting a model rewrite the draft.
//!
//! Model failures never escape an agent: the affected item falls back to
//! the rule-based path and the batch carries a note saying so.

pub mod app;
pub mod orchestrator;
pub mod post_writer;
pub mod prompt;
pub mod theme;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use app::{build_agents, build_orchestrator, Agents};
pub use orchestrator::Orchestrator;
pub use post_writer::{fill_template, PostSettings, PostWriterAgent};
pub use theme::{ThemeAgent, ThemeSettings};
