//! Grading tools: curves, white balance and level calibration.

pub mod channel;
pub mod curves;
pub mod levels;
pub mod white_balance;
