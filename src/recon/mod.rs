pub mod aggregate;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod hours;
pub mod leave_index;
pub mod lifecycle;
pub mod pairing;
