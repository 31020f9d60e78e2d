pub mod code;
pub mod link;
pub mod login;
pub mod recovery;
pub mod verification;
