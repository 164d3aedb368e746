// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use signal_hook::SigId;
use signal_hook::consts::SIGINT;

/// Exit code used when a second Ctrl-C arrives after the latch has been released
const DOUBLE_INTERRUPT_EXIT_CODE: i32 = 128 + SIGINT;

/// A latch that records Ctrl-C instead of letting it kill the process.
///
/// While one of these is alive, SIGINT only sets a flag which polling loops check to wind
/// down cleanly. Once it is dropped, a Ctrl-C that arrives after the first one has been seen
/// exits the process immediately, so a user hammering Ctrl-C is never ignored forever.
pub struct Interrupt
{
	flag: Arc<AtomicBool>,
	registration: Option<SigId>,
}

impl Interrupt
{
	/// Start catching SIGINT
	pub fn register() -> io::Result<Self>
	{
		let flag = Arc::new(AtomicBool::new(false));
		let registration = signal_hook::flag::register(SIGINT, Arc::clone(&flag))?;
		Ok(Self {
			flag,
			registration: Some(registration),
		})
	}

	/// A latch that is not connected to any signal and only fires through [`Interrupt::trigger`]
	pub fn manual() -> Self
	{
		Self {
			flag: Arc::new(AtomicBool::new(false)),
			registration: None,
		}
	}

	pub fn trigger(&self)
	{
		self.flag.store(true, Ordering::Relaxed);
	}

	pub fn is_triggered(&self) -> bool
	{
		self.flag.load(Ordering::Relaxed)
	}

	/// Get a handle on the underlying flag, for triggering from another thread
	pub fn flag(&self) -> Arc<AtomicBool>
	{
		Arc::clone(&self.flag)
	}
}

impl Drop for Interrupt
{
	fn drop(&mut self)
	{
		if let Some(registration) = self.registration.take() {
			signal_hook::low_level::unregister(registration);
			if let Err(error) =
				signal_hook::flag::register_conditional_shutdown(SIGINT, DOUBLE_INTERRUPT_EXIT_CODE, Arc::clone(&self.flag))
			{
				debug!("Could not install the double Ctrl-C handler: {}", error);
			}
		}
	}
}
