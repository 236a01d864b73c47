// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Common Modul for the laptimer
//!
//! Provides the common data types that are used across every modul.

pub mod board_event;
pub mod circuit;
pub mod device_session;
pub mod elapsed_time_source;
pub mod fix;
pub mod messages;
pub mod serde;
pub mod session_event;
pub mod test_helper;

#[cfg(test)]
mod tests;
