//! payload builders, one module per protocol family
//!
//! Encoders only lay out bytes. Rate slots, quantity precision and payment codes are resolved by the
//! caller or reported as logic errors before anything is written.

pub mod binary;
pub mod esc;
pub mod tab;
