/// Refinement candidates and their scoring
pub mod candidates;
/// Element-wise H1 error estimates against a reference solution
pub mod estimator;
/// Choose and apply refinements
pub mod selector;
/// The adaptivity loop of one time step
pub mod session;
/// Element selection strategies
pub mod strategy;
