// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::FailurePolicy;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Executor tuning options.
///
/// All fields are optional; anything unset falls back to the defaults in
/// [`crate::config::consts`]. Options are usually built in code but can
/// also be loaded from a YAML file:
///
/// ```yaml
/// channel_capacity: 512
/// default_container_cpus: 2
/// failure_policy: best_effort
/// ```
///
/// # Fields
/// * `channel_capacity` - frames buffered per vertex mailbox before
///   senders suspend (a zero is treated as 1)
/// * `default_container_cpus` - CPU budget for containers that declare
///   none (a zero is treated as 1)
/// * `failure_policy` - how the executor reacts to a dead vertex
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorOptions {
    pub channel_capacity: Option<usize>,
    pub default_container_cpus: Option<u32>,
    pub failure_policy: Option<FailurePolicy>,
}

/// Load executor options from a YAML file.
pub fn load_options(path: impl AsRef<Path>) -> Result<ExecutorOptions, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let options: ExecutorOptions = serde_yaml::from_str(&content)?;
    Ok(options)
}
