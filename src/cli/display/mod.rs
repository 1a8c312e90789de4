//! Terminal rendering helpers.

pub mod table;

pub use table::{actions_table, controls_table, hazards_table, proposal_table, steps_table};
