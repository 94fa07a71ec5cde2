//! Core domain types for the STCA simulator.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies:
//! the 8-slot [`Pattern`] used for rule matching, [`Rule`]s and [`RuleTable`]s with their
//! symmetry declarations, and the arena-style [`Grid`] of four-subcell [`Cell`]s.
//!
//! Everything here can be used from any layer of the workspace.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod grid;
mod pattern;
mod table;

pub use grid::{Cell, Coord, Direction, Grid, GridError, Subcell};
pub use pattern::{Axis, Pattern, Slot, SubcellState};
pub use table::{ReflectionKind, Rule, RuleTable, TableError};
