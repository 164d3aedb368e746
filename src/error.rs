// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>
//! Module for error handling code.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error
{
	#[error("fcpu must be the non-zero CPU/HCLK frequency of the target")]
	InvalidClockFrequency,

	#[error("OpenOCD is already running in the background (pid {pid}), stop it before starting another session")]
	AlreadyRunning
	{
		pid: u32,
	},

	#[error("Failed to launch `{command}`")]
	Spawn
	{
		#[source]
		source: io::Error,

		/// The full shell command line that was being launched.
		command: String,
	},

	#[error("Failed to wait for OpenOCD (pid {pid}) to exit")]
	Wait
	{
		#[source]
		source: io::Error,
		pid: u32,
	},

	#[error("Failed to signal the OpenOCD process group (pid {pid}) to terminate")]
	Signal
	{
		#[source]
		source: io::Error,
		pid: u32,
	},

	#[error("Failed to create the temporary log file for {purpose}")]
	TempFile
	{
		#[source]
		source: io::Error,

		/// What the temporary file was going to be used for (e.g. `"ITM log output"`).
		purpose: &'static str,
	},

	#[error("Failed to connect to the OpenOCD relay on {address}")]
	Connect
	{
		#[source]
		source: io::Error,
		address: String,
	},

	#[error("I/O error while {context}")]
	Io
	{
		#[source]
		source: io::Error,

		/// What was being done when the error happened (e.g. `"following the ITM log"`).
		context: &'static str,
	},
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error
{
	pub(crate) fn io(context: &'static str) -> impl FnOnce(io::Error) -> Self
	{
		move |source| Self::Io { source, context }
	}
}
