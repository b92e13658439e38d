//! # RVR Bridge Library
//!
//! Drive a Sphero RVR through a generic pin-based robot protocol.
//!
//! The RVR's lights, wheels and sensors are exposed as digital, servo and
//! analog pins behind [`controller::RobotController`]. Pin writes become
//! Sphero API packets on a serial link; streamed sensor packets come back
//! as normalized analog readings.

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod serial;
pub mod sphero;
pub mod telemetry;
