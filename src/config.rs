// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an alternative OpenOCD binary (e.g. a custom build for a specific target)
pub const BINARY_ENV_VAR: &str = "MODM_OPENOCD_BINARY";
/// Binary name used when no override is given, resolved through `PATH` by the shell
pub const DEFAULT_BINARY: &str = "openocd";
/// First port of the RTT relay servers OpenOCD opens, one per channel
pub const DEFAULT_RELAY_BASE_PORT: u16 = 9090;
/// How long to give OpenOCD to open its relay ports before connecting
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Everything a [`crate::launcher::Launcher`] needs to know about its environment.
///
/// This is read once at startup and then passed along explicitly, so nothing further down
/// consults the process environment behind the caller's back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig
{
	/// OpenOCD binary to run - either a path or a bare name to search `PATH` for
	pub binary: OsString,
	/// Directory OpenOCD is run from, `None` meaning the current directory
	pub working_dir: Option<PathBuf>,
	/// Delay between starting OpenOCD and connecting to its RTT relay
	pub settle_delay: Duration,
	/// Host the RTT relay listens on
	pub relay_host: String,
	/// Port of RTT channel 0, channel N listens on this plus N
	pub relay_base_port: u16,
}

impl LauncherConfig
{
	/// Build a configuration from the process environment, consulting [`BINARY_ENV_VAR`].
	pub fn from_env() -> Self
	{
		Self::with_binary_override(std::env::var_os(BINARY_ENV_VAR))
	}

	/// Build a configuration using the given binary override, falling back to [`DEFAULT_BINARY`]
	/// when there isn't one (or it is empty).
	pub fn with_binary_override(binary: Option<OsString>) -> Self
	{
		let binary = binary
			.filter(|binary| !binary.is_empty())
			.unwrap_or_else(|| DEFAULT_BINARY.into());
		Self {
			binary,
			..Self::default()
		}
	}

	/// Replace the binary this configuration launches
	pub fn binary(mut self, binary: impl Into<OsString>) -> Self
	{
		self.binary = binary.into();
		self
	}

	/// Compute the relay address for the given RTT channel
	pub fn relay_address(&self, channel: u16) -> String
	{
		format!("{}:{}", self.relay_host, self.relay_base_port.saturating_add(channel))
	}
}

impl Default for LauncherConfig
{
	fn default() -> Self
	{
		Self {
			binary: DEFAULT_BINARY.into(),
			working_dir: None,
			settle_delay: DEFAULT_SETTLE_DELAY,
			relay_host: "localhost".into(),
			relay_base_port: DEFAULT_RELAY_BASE_PORT,
		}
	}
}
