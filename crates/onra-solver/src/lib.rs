//! # onra-solver: the external ILP solver driver
//!
//! Wraps the `glpsol` binary behind a narrow [`GlpsolDriver::solve`] call so
//! that the rest of the system never touches process plumbing. Swapping GLPK
//! for another ILP solver means writing another driver with the same
//! surface.
//!
//! ```text
//! onra ──argv──> glpsol (subprocess)
//!      <─stdout── decision lines ("# ...") + status
//!      <─.sol──── objective value
//! ```

pub mod driver;
pub mod error;
pub mod solution;

pub use driver::{GlpsolDriver, SolveOutcome};
pub use error::{SolverError, SolverResult};
pub use solution::{Solution, SolutionRow};
