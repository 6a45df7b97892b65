mod assignment;

pub use assignment::{AssignableUser, AssignmentOutcome, TechnicianLoad};
