//! Scenario-based tests for staging
//!
//! Every scenario runs real shell commands, so these only build on Unix.

#![cfg(unix)]

mod helpers;

mod driver;
mod stage_flow;
