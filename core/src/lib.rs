//! Rule engine for soliton-valued triangular cellular automata.
//!
//! - [`symmetry`]: rotation and reflection of 8-slot patterns, and the fixed
//!   enumeration order of a table's symmetry variants
//! - [`executor`]: matching a live neighbourhood and firing at most one rule
//! - [`analyzer`]: forward determinism and reversibility of a rule table
//! - [`verifier`]: randomized and exhaustive search from a source to a target grid
//! - [`catalog`]: the built-in automata
//! - [`persist`]: the `.con` configuration format
//!
//! Nothing here spawns threads or holds global state; the current automaton is always
//! passed in explicitly.

pub mod analyzer;
pub mod catalog;
pub mod executor;
pub mod persist;
pub mod symmetry;
pub mod verifier;

pub use analyzer::{
    DeterminismReport, TimeDirection, Violation, find_violation, is_locally_deterministic,
};
pub use catalog::{Catalog, CatalogError, NamedTable};
pub use executor::{Firing, find_match, try_fire};
pub use persist::{Annotation, Configuration, PersistError};
pub use symmetry::{Variant, reflect, rotate, variants};
pub use verifier::{
    DEFAULT_MAX_STALLS, PathVerifier, SelectionMode, StepOutcome, Verdict, VerifierError,
    VerifierOptions, VerifierProgress, VerifierState,
};
