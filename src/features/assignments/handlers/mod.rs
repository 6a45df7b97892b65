mod assignment_handler;

pub use assignment_handler::*;
