pub mod settings;
pub mod users;
pub mod verification_codes;
