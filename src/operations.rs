// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>
//! One-shot operations that run OpenOCD to completion and report its exit code.

use std::path::Path;

use log::info;

use crate::command_line::{CommandSet, RESET_COMMANDS, program_command};
use crate::config::LauncherConfig;
use crate::error::Result;
use crate::launcher::Launcher;

/// Program the firmware image at `source` into the target, returning OpenOCD's exit code
pub fn program(config: &LauncherConfig, source: &Path, configs: &[String], search: &[String]) -> Result<i32>
{
	info!("Programming {}", source.display());
	let commands = CommandSet::new([program_command(source)], configs.to_vec(), search.to_vec());
	run(config, &commands)
}

/// Reset the target and let OpenOCD exit, returning its exit code
pub fn reset(config: &LauncherConfig, configs: &[String], search: &[String]) -> Result<i32>
{
	info!("Resetting target");
	let commands = CommandSet::new(RESET_COMMANDS, configs.to_vec(), search.to_vec());
	run(config, &commands)
}

fn run(config: &LauncherConfig, commands: &CommandSet) -> Result<i32>
{
	let launcher = Launcher::new(config.clone(), CommandSet::default());
	let code = launcher.call_blocking(commands, false)?;
	if code != 0 {
		info!("OpenOCD exited with code {}", code);
	}
	Ok(code)
}
