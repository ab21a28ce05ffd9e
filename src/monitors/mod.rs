//! Pure decision logic shared by all probes.
//!
//! Nothing in here performs I/O: a probe hands in what it observed and gets
//! back a classification or a finished event.

pub mod event;
pub mod threshold;
