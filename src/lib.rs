//! A (Partial, Weighted, Partitioned) MaxSAT solver driven by unsat-core
//! guided search over a built-in CDCL oracle. Modules are laid out in
//! dependency order: oracle and encoder first, formula model next, then the
//! core-guided engines, the partition controller, and the BMO driver on top.
pub mod bmo;
pub mod cancel;
pub mod cli;
pub mod engine;
pub mod error;
pub mod formula;
pub mod oracle;
pub mod partition;
pub mod stats;
pub mod totalizer;
pub mod types;
