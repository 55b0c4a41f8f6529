//! Shared test harness: in-memory collaborators wired into a handler, plus a
//! scripted language model.

#![allow(dead_code)]

pub mod harness;
pub mod scripted_model;
pub mod strategies;

pub use harness::*;
pub use scripted_model::*;
