//! Test Fixtures Module
//!
//! Programmatically generated PCM for AIUI session tests.

// Not every test binary uses every fixture
#![allow(dead_code)]

pub mod audio_fixtures;

pub use audio_fixtures::*;
