pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod renewal;
pub mod reporting;
pub mod services;
pub mod startup;
