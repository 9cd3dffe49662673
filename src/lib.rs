pub mod authz;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod render;
pub mod report;
pub mod session;
pub mod surface;
pub mod upstream;
