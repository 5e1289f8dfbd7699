pub mod ics;
pub mod resend_client;
