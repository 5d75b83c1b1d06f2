pub mod anomaly;
pub mod employee;
pub mod leave;
pub mod punch;
pub mod shift;
