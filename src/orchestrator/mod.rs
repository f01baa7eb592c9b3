//! Console orchestration.
//!
//! This module owns the controller lifecycle (pollers, user actions, teardown) and
//! the one-shot requests behind it. UI layers talk to it through `UiCommand`s and
//! read the resulting `ConsoleEvent`s.

mod actions;
mod controller;

pub(crate) use controller::{run_controller, UiCommand};
