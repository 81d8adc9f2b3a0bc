pub mod aggregate;
pub mod condition;
pub mod join;
pub mod query;
pub mod scan;
pub mod sort;
