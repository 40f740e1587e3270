pub mod classify;
pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod extract;
pub mod flatten;
pub mod mapping;
pub mod oracle;
pub mod organize;
pub mod pipeline;
pub mod repair;
pub mod report;
pub mod route;
pub mod schema;
pub mod util;
