//! # Sphero API Module
//!
//! Implementation of the Sphero API v2 packet format spoken by the RVR over UART.
//!
//! This module handles:
//! - Command packet encoding (wake, battery, LEDs, raw motors, streaming)
//! - Incoming packet framing and decoding (battery responses, sensor streams)
//! - Checksum calculation and byte escaping

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod checksum;
