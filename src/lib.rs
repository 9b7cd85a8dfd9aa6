pub mod api_router;
pub mod appraisals;
pub mod auth;
pub mod config;
pub mod dashboards;
pub mod directory;
pub mod goals;
pub mod settings;
pub mod shared;
