//! Missile guidance for the combat layer: a pure step function and the worker thread
//! that runs it off the frame loop.

pub mod guidance;
pub mod worker;

pub use guidance::*;
pub use worker::*;
