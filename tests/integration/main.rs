//! Integration tests for the public driver API

mod codec_tests;
mod driver_tests;
mod interpreter_tests;
