// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>
//! Following the ITM/SWO log stream of a target.
//!
//! OpenOCD is told to write everything the target emits over SWO into a temporary file, which
//! we then follow much like `tail -f` until the user presses Ctrl-C.

use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write, stdout};
use std::path::Path;
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::backend::{DebugBackend, with_scope};
use crate::command_line::itm_command;
use crate::error::{Error, Result};
use crate::interrupt::Interrupt;

/// How long to wait before looking at the log file again when nothing new was written
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Stream the target's ITM output to stdout until Ctrl-C is pressed.
///
/// `fcpu` is the target's CPU clock frequency in Hz and must not be zero. Without a
/// `baudrate`, OpenOCD picks the fastest SWO rate the probe supports.
pub fn itm<B>(backend: &mut B, fcpu: u64, baudrate: Option<u32>) -> Result<()>
where
	B: DebugBackend + ?Sized,
{
	// Validate before hooking Ctrl-C so nothing at all happens for bad input
	validate_clock(fcpu)?;
	let interrupt = Interrupt::register().map_err(Error::io("installing the Ctrl-C handler"))?;
	let mut output = stdout().lock();
	itm_until(backend, fcpu, baudrate, &interrupt, &mut output)
}

/// Stream the target's ITM output into `output` until `interrupt` fires.
pub fn itm_until<B, W>(
	backend: &mut B, fcpu: u64, baudrate: Option<u32>, interrupt: &Interrupt, output: &mut W,
) -> Result<()>
where
	B: DebugBackend + ?Sized,
	W: Write,
{
	validate_clock(fcpu)?;

	let log_file = tempfile::Builder::new()
		.prefix("openocd-itm-")
		.suffix(".log")
		.tempfile()
		.map_err(|source| Error::TempFile {
			source,
			purpose: "ITM log output",
		})?;
	debug!("Collecting ITM output in {}", log_file.path().display());
	backend.add_command(itm_command(log_file.path(), fcpu, baudrate));

	with_scope(backend, |_| {
		info!("Following ITM output, press Ctrl-C to stop");
		follow(log_file.path(), output, interrupt)
	})
}

fn validate_clock(fcpu: u64) -> Result<()>
{
	if fcpu == 0 {
		return Err(Error::InvalidClockFrequency);
	}
	Ok(())
}

/// Copy everything appended to the file at `path` into `output` until `interrupt` fires.
///
/// Whatever was already written when the interrupt arrives is still copied out before
/// returning. If the file shrinks, it is assumed to have been truncated and is read again
/// from the start.
pub fn follow<W>(path: &Path, output: &mut W, interrupt: &Interrupt) -> Result<()>
where
	W: Write,
{
	let mut file = File::open(path).map_err(Error::io("opening the log file"))?;
	let mut position = 0;

	loop {
		// Sample the interrupt first so one last pass picks up anything written before it
		let stopping = interrupt.is_triggered();

		let length = file
			.metadata()
			.map_err(Error::io("checking the log file"))?
			.len();
		if length < position {
			info!("Log file was truncated, reading it from the start again");
			position = file
				.seek(SeekFrom::Start(0))
				.map_err(Error::io("rewinding the log file"))?;
		}

		let copied = copy_available(&mut file, output).map_err(Error::io("following the log file"))?;
		position += copied;

		if stopping {
			debug!("Interrupted, stopped following the log file");
			return Ok(());
		}
		if copied == 0 {
			thread::sleep(POLL_INTERVAL);
		}
	}
}

/// Copy from `file` to `output` until the current end of file, returning how much was copied
fn copy_available<W>(file: &mut File, output: &mut W) -> io::Result<u64>
where
	W: Write,
{
	let mut buffer = [0u8; 4096];
	let mut total = 0;
	loop {
		let count = match file.read(&mut buffer) {
			Ok(0) => break,
			Ok(count) => count,
			Err(error) if error.kind() == ErrorKind::Interrupted => continue,
			Err(error) => return Err(error),
		};
		output.write_all(&buffer[..count])?;
		total += count as u64;
	}
	if total != 0 {
		output.flush()?;
	}
	Ok(total)
}

#[cfg(test)]
mod tests
{
	use std::fs::OpenOptions;
	use std::sync::atomic::Ordering;
	use std::time::Duration;

	use super::*;
	use crate::backend::testing::RecordingBackend;

	#[test]
	fn zero_clock_is_rejected_before_starting()
	{
		let mut backend = RecordingBackend::default();
		let interrupt = Interrupt::manual();
		let mut output = Vec::new();

		let result = itm_until(&mut backend, 0, None, &interrupt, &mut output);
		assert!(matches!(result, Err(Error::InvalidClockFrequency)));
		assert_eq!(backend.starts, 0);
		assert!(backend.commands.is_empty());

		assert!(matches!(itm(&mut backend, 0, Some(115_200)), Err(Error::InvalidClockFrequency)));
		assert_eq!(backend.starts, 0);
	}

	#[test]
	fn interrupt_ends_session_cleanly()
	{
		let mut backend = RecordingBackend::default();
		let interrupt = Interrupt::manual();
		let flag = interrupt.flag();
		let trigger = thread::spawn(move || {
			thread::sleep(Duration::from_millis(300));
			flag.store(true, Ordering::Relaxed);
		});

		let mut output = Vec::new();
		itm_until(&mut backend, 64_000_000, Some(2_000_000), &interrupt, &mut output).unwrap();
		trigger.join().unwrap();

		assert_eq!((backend.starts, backend.stops), (1, 1));
		assert_eq!(backend.commands.len(), 1);
		assert!(backend.commands[0].starts_with("modm_itm_log "));
		assert!(backend.commands[0].ends_with(" 64000000 2000000"));
	}

	#[test]
	fn follows_appended_data() -> io::Result<()>
	{
		let log_file = tempfile::NamedTempFile::new()?;
		let path = log_file.path().to_path_buf();
		let interrupt = Interrupt::manual();
		let flag = interrupt.flag();

		let writer = thread::spawn(move || -> io::Result<()> {
			let mut file = OpenOptions::new().append(true).open(&path)?;
			file.write_all(b"hello\n")?;
			thread::sleep(Duration::from_millis(150));
			file.write_all(b"world\n")?;
			flag.store(true, Ordering::Relaxed);
			Ok(())
		});

		let mut output = Vec::new();
		follow(log_file.path(), &mut output, &interrupt).unwrap();
		writer.join().unwrap()?;

		assert_eq!(output, b"hello\nworld\n");
		Ok(())
	}

	#[test]
	fn truncation_restarts_from_the_beginning() -> io::Result<()>
	{
		let log_file = tempfile::NamedTempFile::new()?;
		std::fs::write(log_file.path(), b"first run\n")?;
		let path = log_file.path().to_path_buf();
		let interrupt = Interrupt::manual();
		let flag = interrupt.flag();

		let writer = thread::spawn(move || -> io::Result<()> {
			thread::sleep(Duration::from_millis(250));
			std::fs::write(&path, b"new\n")?;
			thread::sleep(Duration::from_millis(250));
			flag.store(true, Ordering::Relaxed);
			Ok(())
		});

		let mut output = Vec::new();
		follow(log_file.path(), &mut output, &interrupt).unwrap();
		writer.join().unwrap()?;

		assert_eq!(output, b"first run\nnew\n");
		Ok(())
	}
}
