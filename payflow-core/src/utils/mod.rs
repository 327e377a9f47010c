pub mod payers;
pub mod schedule;
