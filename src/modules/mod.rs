pub mod auth;
pub mod classes;
pub mod dashboards;
pub mod roles;
pub mod schools;
pub mod students;
pub mod teachers;
pub mod users;
