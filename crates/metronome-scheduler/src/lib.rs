//! `metronome-scheduler` — polled task registry driving recurrence rules.
//!
//! # Overview
//!
//! A [`Scheduler`] holds named tasks, each a recurrence rule from
//! `metronome-core` plus any number of callbacks. [`Scheduler::run`] polls
//! the registry on a configurable cadence (10..=500 ms) and, for every task
//! whose deadline has passed, invokes its callbacks in registration order
//! and re-arms the rule. Single-shot tasks are removed after their first
//! fire.
//!
//! # Shape
//!
//! | Piece                | Role                                          |
//! |----------------------|-----------------------------------------------|
//! | [`Scheduler`]        | Clone-able handle; registry + poll loop       |
//! | [`Callback`]         | `Box<dyn Fn() + Send>`, run on the poll task  |
//! | [`SchedulerConfig`]  | Cadence and clock offset, file/env loadable   |
//! | [`SchedulerError`]   | Registry and lifecycle failures               |
//!
//! Callbacks run synchronously under the registry lock; they must not call
//! back into the scheduler, except [`Scheduler::stop`].

pub mod config;
pub mod engine;
pub mod error;

pub use config::{SchedulerConfig, DEFAULT_ACCURACY_MS, MAX_ACCURACY_MS, MIN_ACCURACY_MS};
pub use engine::{Callback, Scheduler};
pub use error::{Result, SchedulerError};
