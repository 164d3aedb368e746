// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>

use std::io::stdout;

use clap::{Args, CommandFactory, Subcommand};
use clap_complete::{Shell, generate};
use color_eyre::eyre::{Context, Result};
use openocd_runner::LauncherConfig;
use openocd_runner::backend::Backend;
use openocd_runner::follow::itm;
use openocd_runner::relay::rtt;

use crate::CliArguments;

#[derive(Subcommand)]
pub enum ToplevelCommands
{
	/// Follow the target's ITM/SWO log output until Ctrl-C is pressed
	Itm(ItmArguments),
	/// Connect the terminal to one of the target's RTT channels
	Rtt(RttArguments),
	/// Generate completions data for the shell
	Complete(CompletionArguments),
}

impl ToplevelCommands
{
	/// Run the subcommand, producing the exit code to leave with
	pub fn run(&self, config: &LauncherConfig) -> Result<i32>
	{
		match self {
			Self::Itm(itm_args) => {
				let mut launcher = itm_args.backend.launcher(config.clone());
				itm(&mut launcher, itm_args.fcpu, itm_args.baudrate).wrap_err("following ITM output")?;
			},
			Self::Rtt(rtt_args) => {
				let mut launcher = rtt_args.backend.launcher(config.clone());
				rtt(&mut launcher, config, rtt_args.channel)
					.wrap_err_with(|| format!("relaying RTT channel {}", rtt_args.channel))?;
			},
			Self::Complete(comp_args) => {
				let mut cmd = CliArguments::command();
				generate(comp_args.shell, &mut cmd, "openocd-runner", &mut stdout());
			},
		}
		Ok(0)
	}
}

#[derive(Args)]
pub struct ItmArguments
{
	#[arg(long = "fcpu", value_name = "HZ")]
	/// CPU/HCLK frequency of the target in Hz
	fcpu: u64,
	#[arg(long = "baudrate")]
	/// SWO baud rate, the fastest rate the probe supports if not given
	baudrate: Option<u32>,

	#[command(subcommand)]
	backend: Backend,
}

#[derive(Args)]
pub struct RttArguments
{
	#[arg(long = "channel", default_value_t = 0)]
	/// RTT channel to connect to
	channel: u16,

	#[command(subcommand)]
	backend: Backend,
}

#[derive(Args)]
pub struct CompletionArguments
{
	shell: Shell,
}

#[cfg(test)]
mod tests
{
	use clap::Parser;
	use openocd_runner::backend::OpenOcdArgs;

	use super::*;

	#[test]
	fn itm_with_backend()
	{
		let args = CliArguments::parse_from([
			"openocd-runner", "itm", "--fcpu", "64000000", "openocd", "-f", "a.cfg", "-c", "init",
		]);
		match args.subcommand {
			Some(ToplevelCommands::Itm(itm_args)) => {
				assert_eq!(itm_args.fcpu, 64_000_000);
				assert_eq!(itm_args.baudrate, None);
				assert_eq!(
					itm_args.backend,
					Backend::OpenOcd(OpenOcdArgs {
						config: vec!["a.cfg".into()],
						search: vec![],
						commands: vec!["init".into()],
					})
				);
			},
			_ => panic!("expected the itm subcommand"),
		}
	}

	#[test]
	fn rtt_defaults_to_channel_zero()
	{
		let args = CliArguments::parse_from(["openocd-runner", "rtt", "openocd", "-f", "a.cfg"]);
		match args.subcommand {
			Some(ToplevelCommands::Rtt(rtt_args)) => assert_eq!(rtt_args.channel, 0),
			_ => panic!("expected the rtt subcommand"),
		}
	}

	#[test]
	fn zero_clock_fails_without_starting_openocd()
	{
		let args = CliArguments::parse_from([
			"openocd-runner", "itm", "--fcpu", "0", "openocd", "-f", "a.cfg",
		]);
		let config = LauncherConfig::default().binary("/nonexistent/openocd");
		let result = args.subcommand.unwrap().run(&config);
		assert!(result.is_err());
	}
}
