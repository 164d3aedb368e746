// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>
//! Detaching OpenOCD from our terminal session and terminating it again afterwards.
//!
//! OpenOCD has to be started in its own session/process group so that a Ctrl-C meant for us
//! (or for GDB, when debugging) is not also delivered to it. That in turn means it will not
//! die with us, so it has to be explicitly terminated - and how that is done differs per OS.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::process::Command;

/// The platform family we are running on, which decides how OpenOCD is detached and terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform
{
	Posix,
	Windows,
}

impl Platform
{
	pub const fn current() -> Self
	{
		if cfg!(windows) { Self::Windows } else { Self::Posix }
	}
}

impl Display for Platform
{
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result
	{
		match self {
			Self::Posix => write!(f, "POSIX"),
			Self::Windows => write!(f, "Windows"),
		}
	}
}

/// Outcome of asking a process group to terminate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination
{
	/// The termination request was delivered
	Signalled,
	/// There was nothing left to signal, the process had already exited
	AlreadyExited,
}

/// How a detached process group is created and torn down again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator
{
	/// New session via `setsid()` at spawn, `SIGTERM` to the whole process group on stop
	ProcessGroup,
	/// `CREATE_NEW_PROCESS_GROUP` at spawn, `CTRL_BREAK_EVENT` to the group on stop
	ConsoleBreak,
}

impl Terminator
{
	pub const fn for_platform(platform: Platform) -> Self
	{
		match platform {
			Platform::Posix => Self::ProcessGroup,
			Platform::Windows => Self::ConsoleBreak,
		}
	}

	/// Configure `command` so the process it spawns leads its own process group
	pub fn detach(&self, command: &mut Command)
	{
		match self {
			Self::ProcessGroup => process_group::detach(command),
			Self::ConsoleBreak => console_break::detach(command),
		}
	}

	/// Ask the process group led by `pid` to terminate. This does not wait for it to do so.
	pub fn terminate(&self, pid: u32) -> io::Result<Termination>
	{
		match self {
			Self::ProcessGroup => process_group::terminate(pid),
			Self::ConsoleBreak => console_break::terminate(pid),
		}
	}
}

impl Default for Terminator
{
	fn default() -> Self
	{
		Self::for_platform(Platform::current())
	}
}

fn unsupported(mechanism: &str) -> io::Error
{
	io::Error::new(
		io::ErrorKind::Unsupported,
		format!("{} process termination is not available on {}", mechanism, Platform::current()),
	)
}

#[cfg(unix)]
mod process_group
{
	use std::io;
	use std::os::unix::process::CommandExt;
	use std::process::Command;

	use log::{debug, warn};
	use nix::errno::Errno;
	use nix::sys::signal::{Signal, killpg};
	use nix::unistd::{Pid, getpgid};

	use super::Termination;

	pub(super) fn detach(command: &mut Command)
	{
		// SAFETY: setsid() is async-signal-safe and touches no state shared with the parent
		unsafe {
			command.pre_exec(|| {
				if libc::setsid() == -1 {
					return Err(io::Error::last_os_error());
				}
				Ok(())
			});
		}
	}

	pub(super) fn terminate(pid: u32) -> io::Result<Termination>
	{
		let pid = Pid::from_raw(pid as libc::pid_t);
		// Look the group up rather than assuming it matches the pid, in case the process
		// has moved itself into another group since it was started
		let group = match getpgid(Some(pid)) {
			Ok(group) => group,
			Err(Errno::ESRCH) => {
				warn!("OpenOCD (pid {}) already exited before it could be stopped", pid);
				return Ok(Termination::AlreadyExited);
			},
			Err(errno) => return Err(errno.into()),
		};

		debug!("Sending SIGTERM to process group {}", group);
		match killpg(group, Signal::SIGTERM) {
			Ok(()) => Ok(Termination::Signalled),
			Err(Errno::ESRCH) => {
				warn!("Process group {} vanished before it could be signalled", group);
				Ok(Termination::AlreadyExited)
			},
			Err(errno) => Err(errno.into()),
		}
	}
}

#[cfg(not(unix))]
mod process_group
{
	use std::io;
	use std::process::Command;

	use super::{Termination, unsupported};

	pub(super) fn detach(_command: &mut Command) {}

	pub(super) fn terminate(_pid: u32) -> io::Result<Termination>
	{
		Err(unsupported("Process group"))
	}
}

#[cfg(windows)]
mod console_break
{
	use std::io;
	use std::os::windows::process::CommandExt;
	use std::process::Command;

	use log::debug;
	use ::windows::Win32::System::Console::{CTRL_BREAK_EVENT, GenerateConsoleCtrlEvent};
	use ::windows::Win32::System::Threading::CREATE_NEW_PROCESS_GROUP;

	use super::Termination;

	pub(super) fn detach(command: &mut Command)
	{
		command.creation_flags(CREATE_NEW_PROCESS_GROUP.0);
	}

	pub(super) fn terminate(pid: u32) -> io::Result<Termination>
	{
		debug!("Sending CTRL_BREAK_EVENT to process group {}", pid);
		// SAFETY: plain FFI call taking two integers, the group id is the pid of its root process
		unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid) }.map_err(|_| io::Error::last_os_error())?;
		Ok(Termination::Signalled)
	}
}

#[cfg(not(windows))]
mod console_break
{
	use std::io;
	use std::process::Command;

	use super::{Termination, unsupported};

	pub(super) fn detach(_command: &mut Command) {}

	pub(super) fn terminate(_pid: u32) -> io::Result<Termination>
	{
		Err(unsupported("Console break"))
	}
}
