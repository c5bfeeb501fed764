// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing module.
//!
//! This module provides the tempo map used to turn tick distances into
//! wall-clock delays during playback.

pub mod tempo;

pub use tempo::{TempoMap, DEFAULT_TEMPO};
