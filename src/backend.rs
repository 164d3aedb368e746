// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>
//! The seam between this tool and a debugging front-end that can drive several different
//! debug servers. A backend is anything that can be started in the background, stopped again,
//! and handed extra commands before being started.

use clap::{ArgMatches, Args, Command, FromArgMatches, Subcommand};
use log::{debug, warn};

use crate::command_line::CommandSet;
use crate::config::LauncherConfig;
use crate::error::Result;
use crate::launcher::Launcher;

/// Name the OpenOCD backend registers itself under
pub const SUBCOMMAND: &str = "openocd";

pub trait DebugBackend
{
	/// Start the debug server in the background
	fn start(&mut self) -> Result<()>;
	/// Stop the debug server, doing nothing if it isn't running
	fn stop(&mut self) -> Result<()>;
	/// Queue a command to be run by the debug server the next time it is started
	fn add_command(&mut self, command: String);

	/// Address GDB should `target extended-remote` to while the server is running
	fn gdb_remote(&self) -> &str
	{
		":3333"
	}
}

impl DebugBackend for Launcher
{
	fn start(&mut self) -> Result<()>
	{
		Launcher::start(self)
	}

	fn stop(&mut self) -> Result<()>
	{
		Launcher::stop(self)
	}

	fn add_command(&mut self, command: String)
	{
		self.push_command(command);
	}
}

/// Keeps a backend running in the background for as long as it is alive.
///
/// Creating the scope starts the backend, and the backend is stopped exactly once when the
/// scope ends - either through [`BackgroundScope::finish`], or on drop when the scope is left
/// early by an error or a panic.
pub struct BackgroundScope<'a, B: DebugBackend + ?Sized>
{
	backend: &'a mut B,
	stopped: bool,
}

impl<'a, B: DebugBackend + ?Sized> BackgroundScope<'a, B>
{
	pub fn enter(backend: &'a mut B) -> Result<Self>
	{
		backend.start()?;
		debug!("Entered background debug server scope");
		Ok(Self {
			backend,
			stopped: false,
		})
	}

	pub fn backend(&mut self) -> &mut B
	{
		&mut *self.backend
	}

	/// End the scope, reporting any error from stopping the backend
	pub fn finish(mut self) -> Result<()>
	{
		self.stopped = true;
		self.backend.stop()
	}
}

impl<B: DebugBackend + ?Sized> Drop for BackgroundScope<'_, B>
{
	fn drop(&mut self)
	{
		if !self.stopped {
			self.stopped = true;
			if let Err(error) = self.backend.stop() {
				warn!("Failed to stop the background debug server: {}", error);
			}
		}
	}
}

/// Run `action` while `backend` runs in the background, stopping it again however `action` ends.
///
/// An error from `action` takes precedence over one from stopping the backend.
pub fn with_scope<B, T, F>(backend: &mut B, action: F) -> Result<T>
where
	B: DebugBackend + ?Sized,
	F: FnOnce(&mut B) -> Result<T>,
{
	let mut scope = BackgroundScope::enter(backend)?;
	let result = action(scope.backend());
	let stopped = scope.finish();
	let value = result?;
	stopped?;
	Ok(value)
}

/// Arguments selecting and configuring OpenOCD as the debug backend
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOcdArgs
{
	#[arg(short = 'f', value_name = "CONFIG")]
	/// Use these OpenOCD config files
	pub config: Vec<String>,
	#[arg(short = 's', value_name = "DIR")]
	/// Search in these paths for config files
	pub search: Vec<String>,
	#[arg(short = 'c', value_name = "COMMAND")]
	/// Extra OpenOCD commands
	pub commands: Vec<String>,
}

impl OpenOcdArgs
{
	pub fn command_set(&self) -> CommandSet
	{
		CommandSet::new(self.commands.clone(), self.config.clone(), self.search.clone())
	}

	/// Build the launcher these arguments describe
	pub fn launcher(&self, config: LauncherConfig) -> Launcher
	{
		Launcher::new(config, self.command_set())
	}
}

/// The debug backends this tool knows how to drive
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Backend
{
	/// Use OpenOCD as backend
	#[command(name = "openocd")]
	OpenOcd(OpenOcdArgs),
}

impl Backend
{
	pub fn launcher(&self, config: LauncherConfig) -> Launcher
	{
		match self {
			Self::OpenOcd(args) => args.launcher(config),
		}
	}
}

/// Register the OpenOCD backend as a subcommand of `registry`, for builder-style front-ends.
///
/// Pair this with [`launcher_from_matches`] to build the launcher once arguments are parsed.
pub fn register_subcommand(registry: Command) -> Command
{
	registry.subcommand(OpenOcdArgs::augment_args(
		Command::new(SUBCOMMAND).about("Use OpenOCD as backend"),
	))
}

/// Build a launcher if the OpenOCD backend was the subcommand chosen in `matches`
pub fn launcher_from_matches(
	matches: &ArgMatches, config: LauncherConfig,
) -> std::result::Result<Option<Launcher>, clap::Error>
{
	match matches.subcommand() {
		Some((SUBCOMMAND, backend_matches)) => {
			let args = OpenOcdArgs::from_arg_matches(backend_matches)?;
			Ok(Some(args.launcher(config)))
		},
		_ => Ok(None),
	}
}

#[cfg(test)]
pub(crate) mod testing
{
	use super::DebugBackend;
	use crate::error::{Error, Result};

	/// Counts how often it is started and stopped instead of running anything
	#[derive(Default)]
	pub(crate) struct RecordingBackend
	{
		pub starts: usize,
		pub stops: usize,
		pub commands: Vec<String>,
		pub fail_start: bool,
	}

	impl DebugBackend for RecordingBackend
	{
		fn start(&mut self) -> Result<()>
		{
			if self.fail_start {
				return Err(Error::InvalidClockFrequency);
			}
			self.starts += 1;
			Ok(())
		}

		fn stop(&mut self) -> Result<()>
		{
			self.stops += 1;
			Ok(())
		}

		fn add_command(&mut self, command: String)
		{
			self.commands.push(command);
		}
	}
}

#[cfg(test)]
mod tests
{
	use std::panic::{AssertUnwindSafe, catch_unwind};

	use super::*;
	use crate::backend::testing::RecordingBackend;
	use crate::error::Error;

	#[test]
	fn scope_stops_once_on_success()
	{
		let mut backend = RecordingBackend::default();
		let value = with_scope(&mut backend, |backend| {
			assert_eq!(backend.starts, 1);
			assert_eq!(backend.stops, 0);
			Ok(42)
		})
		.unwrap();
		assert_eq!(value, 42);
		assert_eq!((backend.starts, backend.stops), (1, 1));
	}

	#[test]
	fn scope_stops_once_on_error()
	{
		let mut backend = RecordingBackend::default();
		let result: Result<()> = with_scope(&mut backend, |_| Err(Error::InvalidClockFrequency));
		assert!(matches!(result, Err(Error::InvalidClockFrequency)));
		assert_eq!((backend.starts, backend.stops), (1, 1));
	}

	#[test]
	fn scope_stops_once_on_panic()
	{
		let mut backend = RecordingBackend::default();
		let result = catch_unwind(AssertUnwindSafe(|| {
			let _scope = BackgroundScope::enter(&mut backend).unwrap();
			panic!("companion action blew up");
		}));
		assert!(result.is_err());
		assert_eq!((backend.starts, backend.stops), (1, 1));
	}

	#[test]
	fn failed_start_is_not_stopped()
	{
		let mut backend = RecordingBackend {
			fail_start: true,
			..Default::default()
		};
		let result = with_scope(&mut backend, |_| Ok(()));
		assert!(result.is_err());
		assert_eq!(backend.stops, 0);
	}

	#[test]
	fn registered_subcommand_builds_launcher()
	{
		let registry = register_subcommand(Command::new("debug-tool"));
		let matches = registry
			.try_get_matches_from(["debug-tool", "openocd", "-f", "a.cfg", "-f", "b.cfg", "-s", "scripts", "-c", "init"])
			.unwrap();
		let launcher = launcher_from_matches(&matches, LauncherConfig::default())
			.unwrap()
			.unwrap();
		assert_eq!(launcher.commands(), &CommandSet::new(["init"], ["a.cfg", "b.cfg"], ["scripts"]));
	}

	#[test]
	fn other_subcommand_is_not_ours()
	{
		let registry = register_subcommand(Command::new("debug-tool")).subcommand(Command::new("jlink"));
		let matches = registry.try_get_matches_from(["debug-tool", "jlink"]).unwrap();
		assert!(launcher_from_matches(&matches, LauncherConfig::default()).unwrap().is_none());
	}

	#[test]
	fn gdb_remote_default()
	{
		let launcher = OpenOcdArgs::default().launcher(LauncherConfig::default());
		assert_eq!(launcher.gdb_remote(), ":3333");
	}
}
