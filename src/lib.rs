//! # Ehtimami API
//!
//! A multi-tenant school management REST API built with Rust, Axum and
//! PostgreSQL.
//!
//! The backend manages schools, users (admins, school managers, teachers,
//! students, parents, employees), roles, classes, enrollment and reporting
//! dashboards. The heart of the system is the set of transactional entity
//! lifecycle workflows: creating a school provisions its manager account,
//! creating a student provisions the user, profile, enrollments and parent
//! links, and deletions cascade so no orphaned managers or parents survive.
//!
//! ## Architecture
//!
//! The codebase follows a modular layout:
//!
//! ```text
//! src/
//! ├── config/           # Per-concern env configuration (database, JWT, SMTP, CORS)
//! ├── middleware/       # Auth extractor and role guards
//! ├── modules/          # Feature modules
//! │   ├── auth/        # Registration, login, password reset
//! │   ├── users/       # User DTO shaping, verification, profile upsert
//! │   ├── roles/       # Role management
//! │   ├── schools/     # School lifecycle incl. manager provisioning
//! │   ├── classes/     # Class lifecycle, schedules, teacher links
//! │   ├── students/    # Student lifecycle incl. parent linkage
//! │   ├── teachers/    # Teacher registration and class assignment
//! │   └── dashboards/  # Read-only reporting
//! └── utils/           # Errors, JWT, password, email, pagination, response envelope
//! ```
//!
//! Each feature module follows a consistent structure: `model.rs` (rows and
//! DTOs), `service.rs` (business logic and transactions), `controller.rs`
//! (HTTP handlers) and `router.rs`.
//!
//! ## Authentication
//!
//! JWT bearer tokens carry the user's id, email, role names and
//! verification flag, so role guards never hit the database. Passwords are
//! hashed with bcrypt; generated passwords (school managers, teachers,
//! auto-created parents) are random and delivered once by email.
//!
//! ## API Documentation
//!
//! With the server running, interactive docs are served at `/swagger-ui`
//! and `/scalar`.

pub mod config;
pub mod docs;
pub mod logging;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod utils;
pub mod validator;
