// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>

use std::process::{Child, Command, ExitStatus};

use log::{debug, info, warn};

use crate::command_line::CommandSet;
use crate::config::LauncherConfig;
use crate::error::{Error, Result};
use crate::terminator::{Termination, Terminator};

/// Runs OpenOCD, either to completion or in the background.
///
/// A launcher owns at most one background OpenOCD process at a time. That process is
/// detached into its own process group so that Ctrl-C in the controlling terminal (or in a
/// GDB session attached through it) does not take OpenOCD down with it; [`Launcher::stop`]
/// (or dropping the launcher) is what terminates it again.
#[derive(Debug)]
pub struct Launcher
{
	config: LauncherConfig,
	commands: CommandSet,
	terminator: Terminator,
	process: Option<Child>,
}

impl Launcher
{
	pub fn new(config: LauncherConfig, commands: CommandSet) -> Self
	{
		Self {
			config,
			commands,
			terminator: Terminator::default(),
			process: None,
		}
	}

	/// Replace the platform-selected terminator
	pub fn with_terminator(mut self, terminator: Terminator) -> Self
	{
		self.terminator = terminator;
		self
	}

	pub fn config(&self) -> &LauncherConfig
	{
		&self.config
	}

	pub fn commands(&self) -> &CommandSet
	{
		&self.commands
	}

	/// Append an extra OpenOCD command, used by the next [`Launcher::start`]
	pub fn push_command(&mut self, command: impl Into<String>)
	{
		self.commands.push_command(command);
	}

	/// The pid of the background OpenOCD process, if one is being held
	pub fn pid(&self) -> Option<u32>
	{
		self.process.as_ref().map(Child::id)
	}

	/// Check whether the background OpenOCD process is still alive
	pub fn is_running(&mut self) -> bool
	{
		match self.process.as_mut().map(Child::try_wait) {
			Some(Ok(None)) => true,
			Some(Ok(Some(_))) | Some(Err(_)) | None => false,
		}
	}

	/// Start OpenOCD in the background with this launcher's command set, silencing its log output.
	///
	/// Returns as soon as the process has been spawned - this does not wait for OpenOCD to
	/// finish initialising.
	pub fn start(&mut self) -> Result<()>
	{
		if let Some(pid) = self.pid() {
			return Err(Error::AlreadyRunning { pid });
		}

		debug!("Starting OpenOCD in the background with {}", self.commands);
		let line = self.commands.silenced().command_line(&self.config.binary);
		let mut command = self.shell_command(&line);
		self.terminator.detach(&mut command);

		let child = command
			.spawn()
			.map_err(|source| Error::Spawn { source, command: line })?;
		info!("Started OpenOCD in the background (pid {})", child.id());
		self.process = Some(child);
		Ok(())
	}

	/// Terminate the background OpenOCD process group and wait for it to exit.
	///
	/// Calling this when nothing is running does nothing, so it is always safe to call again.
	pub fn stop(&mut self) -> Result<()>
	{
		let mut child = match self.process.take() {
			Some(child) => child,
			None => return Ok(()),
		};
		let pid = child.id();

		// Once reaped, the pid may already belong to something else, so never signal it
		if let Ok(Some(status)) = child.try_wait() {
			info!("OpenOCD (pid {}) had already exited with code {}", pid, exit_code(status));
			return Ok(());
		}

		match self.terminator.terminate(pid) {
			Ok(Termination::Signalled) => debug!("Asked OpenOCD (pid {}) to terminate", pid),
			Ok(Termination::AlreadyExited) => (),
			Err(source) => {
				// Make sure at least the root of the group goes away before reporting the failure
				warn!("Could not signal the OpenOCD process group, killing pid {} directly", pid);
				if let Err(error) = child.kill() {
					warn!("Killing pid {} failed too: {}", pid, error);
				}
				let _ = child.wait();
				return Err(Error::Signal { source, pid });
			},
		}

		let status = child.wait().map_err(|source| Error::Wait { source, pid })?;
		info!("OpenOCD (pid {}) stopped with exit code {}", pid, exit_code(status));
		Ok(())
	}

	/// Run OpenOCD with the given command set to completion, returning its exit code.
	///
	/// With `silent` set, OpenOCD's own log output is redirected to the null device.
	pub fn call_blocking(&self, commands: &CommandSet, silent: bool) -> Result<i32>
	{
		let commands = if silent { commands.silenced() } else { commands.clone() };
		let line = commands.command_line(&self.config.binary);
		let status = self
			.shell_command(&line)
			.status()
			.map_err(|source| Error::Spawn { source, command: line })?;
		Ok(exit_code(status))
	}

	/// Build a command that runs `line` through the platform shell, in the configured directory
	fn shell_command(&self, line: &str) -> Command
	{
		debug!("Running: {}", line);
		let mut command = if cfg!(windows) {
			let mut command = Command::new("cmd");
			command.arg("/C").arg(line);
			command
		} else {
			let mut command = Command::new("sh");
			command.arg("-c").arg(line);
			command
		};
		if let Some(working_dir) = &self.config.working_dir {
			command.current_dir(working_dir);
		}
		command
	}
}

impl Drop for Launcher
{
	fn drop(&mut self)
	{
		if self.process.is_some() {
			warn!("Launcher dropped with OpenOCD still running, stopping it");
			if let Err(error) = self.stop() {
				warn!("Failed to stop OpenOCD: {}", error);
			}
		}
	}
}

/// Convert an exit status into a shell-style exit code, reporting death by signal N as 128 + N
pub fn exit_code(status: ExitStatus) -> i32
{
	if let Some(code) = status.code() {
		return code;
	}
	#[cfg(unix)]
	{
		use std::os::unix::process::ExitStatusExt;
		if let Some(signal) = status.signal() {
			return 128 + signal;
		}
	}
	// Only reachable for statuses the platform can't describe, treat as a generic failure
	1
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn stop_without_start_is_noop()
	{
		let mut launcher = Launcher::new(LauncherConfig::default(), CommandSet::default());
		assert!(launcher.stop().is_ok());
		assert!(launcher.stop().is_ok());
		assert_eq!(launcher.pid(), None);
		assert!(!launcher.is_running());
	}

	#[test]
	fn push_command_appends()
	{
		let mut launcher = Launcher::new(LauncherConfig::default(), CommandSet::new(["init"], ["a.cfg"], ["."]));
		launcher.push_command("modm_rtt");
		assert_eq!(launcher.commands().commands, vec!["init", "modm_rtt"]);
	}

	#[cfg(unix)]
	#[test]
	fn exit_code_maps_signals()
	{
		use std::os::unix::process::ExitStatusExt;

		assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
		// Raw wait statuses keep the exit code in the second byte
		assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
		assert_eq!(exit_code(ExitStatus::from_raw(libc::SIGTERM)), 128 + libc::SIGTERM);
	}

	#[cfg(unix)]
	#[test]
	fn blocking_call_reports_exit_code()
	{
		let launcher = Launcher::new(LauncherConfig::default().binary("exit 7;"), CommandSet::default());
		assert_eq!(launcher.call_blocking(&CommandSet::default(), false).unwrap(), 7);
	}
}
