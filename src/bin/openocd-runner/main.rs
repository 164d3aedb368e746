// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>

mod cli_commands;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::builder::styling::Styles;
use clap::{Parser, crate_description, crate_version};
use color_eyre::eyre::{Context, Result, eyre};
use log::{debug, error};
use openocd_runner::LauncherConfig;
use openocd_runner::operations::{program, reset};

use crate::cli_commands::ToplevelCommands;

#[derive(Parser)]
#[command(
	version,
	about = format!("{} v{}", crate_description!(), crate_version!()),
	styles(style()),
	disable_colored_help(false),
	arg_required_else_help(true),
	args_conflicts_with_subcommands(true)
)]
struct CliArguments
{
	#[arg(global = true, short = 'v', long = "verbose", default_value_t = false)]
	/// Log what is being run, including the full OpenOCD command lines
	verbose: bool,
	#[arg(global = true, long = "openocd-binary", value_name = "BIN")]
	/// Use this OpenOCD binary instead of $MODM_OPENOCD_BINARY or `openocd` from PATH
	openocd_binary: Option<OsString>,

	#[arg(value_name = "ELF", conflicts_with = "reset")]
	/// Firmware image to program into the target
	source: Option<PathBuf>,
	#[arg(short = 'f', value_name = "CONFIG")]
	/// Use these OpenOCD config files
	config: Vec<String>,
	#[arg(short = 's', value_name = "DIR")]
	/// Search in these paths for config files
	searchdirs: Vec<String>,
	#[arg(short = 'r', long = "reset", default_value_t = false)]
	/// Reset the target instead of programming it
	reset: bool,

	#[command(subcommand)]
	subcommand: Option<ToplevelCommands>,
}

impl CliArguments
{
	/// Work out the launcher configuration, reading the environment exactly once
	fn launcher_config(&self) -> LauncherConfig
	{
		let config = LauncherConfig::from_env();
		match &self.openocd_binary {
			Some(binary) => config.binary(binary.clone()),
			None => config,
		}
	}
}

fn one_shot(cli_args: &CliArguments, config: &LauncherConfig) -> Result<i32>
{
	if cli_args.reset {
		return reset(config, &cli_args.config, &cli_args.searchdirs).wrap_err("resetting target");
	}
	match &cli_args.source {
		Some(source) => program(config, source, &cli_args.config, &cli_args.searchdirs)
			.wrap_err_with(|| format!("programming {}", source.display())),
		None => Err(eyre!("Nothing to do, give either a firmware image to program or --reset")),
	}
}

/// Clap v3 style (approximate)
/// See https://stackoverflow.com/a/75343828
fn style() -> clap::builder::Styles
{
	Styles::styled()
		.usage(
			anstyle::Style::new()
				.fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow)))
				.bold(),
		)
		.header(
			anstyle::Style::new()
				.bold()
				.fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
		)
		.literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
}

fn main() -> Result<()>
{
	color_eyre::install()?;
	let cli_args = CliArguments::parse();
	env_logger::Builder::new()
		.filter_level(if cli_args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
		.parse_default_env()
		.init();

	let config = cli_args.launcher_config();
	debug!("Using OpenOCD binary {}", config.binary.to_string_lossy());

	let code = match &cli_args.subcommand {
		Some(subcommand) => subcommand.run(&config)?,
		None => one_shot(&cli_args, &config)?,
	};
	if code != 0 {
		error!("OpenOCD failed with exit code {}", code);
	}
	// Hand OpenOCD's exit code straight back to whoever invoked us
	std::process::exit(code)
}
