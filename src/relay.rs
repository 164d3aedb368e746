// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>
//! Interactive access to a target's RTT channels through OpenOCD's RTT relay servers.

use std::io::{self, BufRead, ErrorKind, Read, Write, stdin, stdout};
use std::net::TcpStream;
use std::sync::mpsc::{Receiver, TryRecvError, channel};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::backend::{DebugBackend, with_scope};
use crate::command_line::RTT_COMMAND;
use crate::config::LauncherConfig;
use crate::error::{Error, Result};
use crate::interrupt::Interrupt;

/// How long a read from the relay may block before input and Ctrl-C are checked again
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Connect the terminal to RTT channel `channel` of the target until the relay closes or
/// Ctrl-C is pressed.
pub fn rtt<B>(backend: &mut B, config: &LauncherConfig, channel: u16) -> Result<()>
where
	B: DebugBackend + ?Sized,
{
	let interrupt = Interrupt::register().map_err(Error::io("installing the Ctrl-C handler"))?;
	let input = stdin_channel();
	let mut output = stdout().lock();
	rtt_until(backend, config, channel, &input, &mut output, &interrupt)
}

/// Relay between `input`/`output` and RTT channel `channel` until the relay closes or
/// `interrupt` fires.
pub fn rtt_until<B, W>(
	backend: &mut B, config: &LauncherConfig, channel: u16, input: &Receiver<Vec<u8>>, output: &mut W,
	interrupt: &Interrupt,
) -> Result<()>
where
	B: DebugBackend + ?Sized,
	W: Write,
{
	backend.add_command(RTT_COMMAND.into());

	with_scope(backend, |_| {
		// OpenOCD gives no indication of when its relay ports are open, so this is a best guess
		thread::sleep(config.settle_delay);

		let address = config.relay_address(channel);
		let stream = TcpStream::connect(&address).map_err(|source| Error::Connect {
			source,
			address: address.clone(),
		})?;
		info!("Connected to RTT channel {} on {}, press Ctrl-C to stop", channel, address);
		relay(stream, input, output, interrupt)
	})
}

/// Shuttle bytes between the relay connection and the terminal.
///
/// Returns once the other end closes the connection or `interrupt` fires. Losing the
/// input side (e.g. stdin reaching end of file) does not end the session.
pub fn relay<W>(mut stream: TcpStream, input: &Receiver<Vec<u8>>, output: &mut W, interrupt: &Interrupt)
-> Result<()>
where
	W: Write,
{
	stream
		.set_read_timeout(Some(POLL_INTERVAL))
		.map_err(Error::io("configuring the relay connection"))?;

	let mut buffer = [0u8; 1024];
	let mut input_open = true;
	while !interrupt.is_triggered() {
		// Forward anything typed since the last pass
		while input_open {
			match input.try_recv() {
				Ok(bytes) => stream
					.write_all(&bytes)
					.map_err(Error::io("writing to the relay connection"))?,
				Err(TryRecvError::Empty) => break,
				Err(TryRecvError::Disconnected) => {
					debug!("Terminal input closed, only relaying output from now on");
					input_open = false;
				},
			}
		}

		match stream.read(&mut buffer) {
			Ok(0) => {
				info!("RTT relay connection closed");
				return Ok(());
			},
			Ok(count) => {
				output
					.write_all(&buffer[..count])
					.and_then(|_| output.flush())
					.map_err(Error::io("writing relay output"))?;
			},
			Err(error) if is_timeout(&error) => (),
			Err(error) => return Err(Error::io("reading from the relay connection")(error)),
		}
	}
	debug!("Interrupted, leaving the RTT relay");
	Ok(())
}

fn is_timeout(error: &io::Error) -> bool
{
	matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted)
}

/// Read the terminal line by line on a background thread, handing each line over a channel
pub fn stdin_channel() -> Receiver<Vec<u8>>
{
	let (sender, receiver) = channel();

	thread::spawn(move || {
		let mut line = String::new();
		loop {
			line.clear();
			match stdin().lock().read_line(&mut line) {
				Ok(0) => break,
				Ok(_) => {
					if sender.send(line.as_bytes().to_vec()).is_err() {
						break;
					}
				},
				Err(error) => {
					warn!("Error reading from stdin, input disabled: {}", error);
					break;
				},
			}
		}
	});

	receiver
}
