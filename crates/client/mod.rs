pub mod enrollment_poller;
