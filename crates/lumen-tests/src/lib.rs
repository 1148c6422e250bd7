//! Integration test crate for Lumen.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! Everything runs against the headless texture backend, so no GPU is
//! required.

#[cfg(test)]
mod support;

#[cfg(test)]
mod residency;

#[cfg(test)]
mod editing;

#[cfg(test)]
mod thumbnails;

#[cfg(test)]
mod config;
