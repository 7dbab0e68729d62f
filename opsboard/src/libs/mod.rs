pub mod config;
pub mod contacts;
pub mod gasoges;
pub mod kpi;
pub mod mundosms;
pub mod normalize;
pub mod poller;
