pub mod course;
pub mod payment;
pub mod user;
