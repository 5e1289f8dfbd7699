pub mod catalog;
pub mod enrollments;
pub mod invites;
pub mod students;
