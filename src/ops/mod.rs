pub mod access;
pub mod deadline;
pub mod migrate;
pub mod overdue;
pub mod reconcile;
pub mod revise;
pub mod search;
