// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod executor;

pub(crate) mod worker;

#[cfg(test)]
mod integration_tests;

pub use executor::{ExecutionReport, Executor, State};
