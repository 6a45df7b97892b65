pub mod constants;
pub mod id_generator;
pub mod test_helpers;
pub mod types;
pub mod validation;
