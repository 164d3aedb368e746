// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>

use std::ffi::OsStr;
use std::fmt::{self, Display, Formatter};
use std::path::Path;

/// Commands that make OpenOCD reset the target and then exit
pub const RESET_COMMANDS: [&str; 2] = ["reset", "shutdown"];
/// Command that starts the RTT relay servers
pub const RTT_COMMAND: &str = "modm_rtt";

/// The three ordered lists that make up an OpenOCD invocation.
///
/// Order within each list is kept exactly as given, as OpenOCD evaluates its arguments in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSet
{
	/// Extra commands, passed with `-c`
	pub commands: Vec<String>,
	/// Configuration files, passed with `-f`
	pub configs: Vec<String>,
	/// Script search directories, passed with `-s`
	pub search_paths: Vec<String>,
}

impl CommandSet
{
	pub fn new<C, F, S>(commands: C, configs: F, search_paths: S) -> Self
	where
		C: IntoIterator,
		C::Item: Into<String>,
		F: IntoIterator,
		F::Item: Into<String>,
		S: IntoIterator,
		S::Item: Into<String>,
	{
		Self {
			commands: commands.into_iter().map(Into::into).collect(),
			configs: configs.into_iter().map(Into::into).collect(),
			search_paths: search_paths.into_iter().map(Into::into).collect(),
		}
	}

	/// Append an extra command to the end of the command list
	pub fn push_command(&mut self, command: impl Into<String>)
	{
		self.commands.push(command.into());
	}

	/// Make a copy of this set with OpenOCD's own log output redirected to the null device
	pub fn silenced(&self) -> Self
	{
		let mut result = self.clone();
		result.push_command(format!("log_output {}", null_device()));
		result
	}

	/// Compose the shell command line that runs `binary` with this set of arguments.
	///
	/// Search directories come first, then configuration files, then commands, so that by
	/// the time a command runs every configuration file it may depend on has been loaded.
	pub fn command_line(&self, binary: &OsStr) -> String
	{
		let flags = self
			.search_paths
			.iter()
			.map(|path| ('s', path))
			.chain(self.configs.iter().map(|config| ('f', config)))
			.chain(self.commands.iter().map(|command| ('c', command)));

		let mut result = binary.to_string_lossy().into_owned();
		for (flag, value) in flags {
			result.push_str(&format!(" -{} {}", flag, quote(value)));
		}
		result
	}
}

impl Display for CommandSet
{
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result
	{
		write!(
			f,
			"{} command(s), {} config file(s), {} search path(s)",
			self.commands.len(),
			self.configs.len(),
			self.search_paths.len()
		)
	}
}

/// Build the command that programs the given firmware image into the target.
///
/// The path is wrapped in braces so TCL takes it verbatim, spaces and all.
pub fn program_command(source: &Path) -> String
{
	format!("modm_program {{{}}}", source.display())
}

/// Build the command that streams the target's ITM/SWO output into `log_file`.
///
/// `fcpu` is the target's CPU clock in Hz; without a baud rate OpenOCD picks the fastest
/// rate the probe supports.
pub fn itm_command(log_file: &Path, fcpu: u64, baudrate: Option<u32>) -> String
{
	let baudrate = baudrate.map(|baudrate| baudrate.to_string()).unwrap_or_default();
	format!("modm_itm_log {} {} {}", log_file.display(), fcpu, baudrate)
}

/// The platform's null device, used to throw away OpenOCD's log output
pub const fn null_device() -> &'static str
{
	if cfg!(windows) { "nul" } else { "/dev/null" }
}

/// Double-quote a single argument for the platform shell.
#[cfg(unix)]
fn quote(value: &str) -> String
{
	let mut result = String::with_capacity(value.len() + 2);
	result.push('"');
	for character in value.chars() {
		// These are the only characters that stay special inside double quotes
		if matches!(character, '"' | '\\' | '$' | '`') {
			result.push('\\');
		}
		result.push(character);
	}
	result.push('"');
	result
}

/// Double-quote a single argument for the platform shell.
///
/// `cmd` has no escape for `"` inside a quoted string, so the value is taken as-is.
#[cfg(windows)]
fn quote(value: &str) -> String
{
	format!("\"{}\"", value)
}

#[cfg(test)]
mod tests
{
	use std::path::PathBuf;

	use super::*;

	#[test]
	fn empty_set_is_just_the_binary()
	{
		let set = CommandSet::default();
		assert_eq!(set.command_line(OsStr::new("openocd")), "openocd");
	}

	#[test]
	fn flags_are_grouped_and_ordered()
	{
		let set = CommandSet::new(["init", "halt"], ["board.cfg", "target.cfg"], ["scripts", "more"]);
		assert_eq!(
			set.command_line(OsStr::new("openocd")),
			r#"openocd -s "scripts" -s "more" -f "board.cfg" -f "target.cfg" -c "init" -c "halt""#
		);
	}

	#[test]
	fn one_token_per_entry()
	{
		let set = CommandSet::new(["a", "b", "c"], ["x.cfg"], Vec::<String>::new());
		let line = set.command_line(OsStr::new("openocd"));
		assert_eq!(line.matches(" -c ").count(), 3);
		assert_eq!(line.matches(" -f ").count(), 1);
		assert_eq!(line.matches(" -s ").count(), 0);
	}

	#[test]
	fn program_wraps_path_in_braces()
	{
		let command = program_command(&PathBuf::from("fw.elf"));
		assert_eq!(command, "modm_program {fw.elf}");

		let set = CommandSet::new([command], ["a.cfg"], Vec::<String>::new());
		let line = set.command_line(OsStr::new("openocd"));
		assert!(line.contains(r#"-f "a.cfg""#));
		assert!(line.contains(r#"-c "modm_program {fw.elf}""#));
	}

	#[test]
	fn itm_command_without_baudrate()
	{
		let command = itm_command(&PathBuf::from("/tmp/itm.log"), 64_000_000, None);
		assert_eq!(command, "modm_itm_log /tmp/itm.log 64000000 ");
		let command = itm_command(&PathBuf::from("/tmp/itm.log"), 64_000_000, Some(2_000_000));
		assert_eq!(command, "modm_itm_log /tmp/itm.log 64000000 2000000");
	}

	#[test]
	fn silenced_leaves_set_untouched()
	{
		let set = CommandSet::new(["init"], Vec::<String>::new(), Vec::<String>::new());
		let silenced = set.silenced();
		assert_eq!(set.commands, vec!["init"]);
		assert_eq!(silenced.commands, vec!["init".to_string(), format!("log_output {}", null_device())]);
	}

	#[cfg(unix)]
	#[test]
	fn shell_specials_are_escaped()
	{
		assert_eq!(quote(r#"echo "$HOME""#), r#""echo \"\$HOME\"""#);
		assert_eq!(quote("a\\b`c"), r#""a\\b\`c""#);
	}
}
