//! Repository methods, implemented as `impl KatDb` blocks.

pub mod changelog;
pub mod project;
pub mod snapshot;
pub mod sync_run;
