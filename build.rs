// SPDX-License-Identifier: MIT OR Apache-2.0
// SPDX-FileCopyrightText: 2025 1BitSquared <info@1bitsquared.com>
//! This build script exists only so Windows builds carry a statically linked
//! Visual C runtime, which lets the tool run on machines without the redistributable.

fn main()
{
	// Statically link the Visual C runtime on Windows.
	static_vcruntime::metabuild();
}
