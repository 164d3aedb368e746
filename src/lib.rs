// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>

pub mod backend;
pub mod command_line;
pub mod config;
pub mod error;
pub mod follow;
pub mod interrupt;
pub mod launcher;
pub mod operations;
pub mod relay;
pub mod terminator;

pub use backend::{BackgroundScope, DebugBackend, with_scope};
pub use command_line::CommandSet;
pub use config::LauncherConfig;
pub use error::{Error, Result};
pub use launcher::Launcher;
