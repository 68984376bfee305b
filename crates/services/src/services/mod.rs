pub mod config;
pub mod email;
pub mod leads;
pub mod proposal_email;
