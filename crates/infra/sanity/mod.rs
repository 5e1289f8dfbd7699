pub mod repositories;
pub mod sanity_client;
