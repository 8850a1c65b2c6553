// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Default values for executor tuning.

/// Frames buffered per vertex mailbox before senders suspend.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// CPU budget assumed for a container that declares none.
pub const DEFAULT_CONTAINER_CPUS: u32 = 1;
