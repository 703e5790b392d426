//! Reference-integrity bridge between an AI tool-calling interface and a
//! networked LED controller.
//!
//! The controller accepts whatever it is sent: dangling scene references,
//! malformed gradients, composites pointing at missing virtuals. Everything
//! here validates references and syntax against live controller state before
//! any write, mutates in place instead of delete-and-recreate, and verifies
//! eventually-consistent writes by polling.

pub mod blender;
pub mod config;
pub mod controller;
pub mod error;
pub mod gradient;
pub mod model;
pub mod palette;
pub mod playlists;
pub mod scenes;
pub mod tools;
pub mod validate;

#[cfg(test)]
pub mod testing;
