//! Test utilities shared across unit and integration tests.
//!
//! Provides fake toolchain executables, environment-variable guards, hash
//! helpers, and minimal fixture manifests.

pub mod env_guard;
pub mod env_lock;
pub mod fake_tool;
pub mod hash;
pub mod http;
pub mod manifest;
pub mod path_guard;

pub use env_guard::EnvGuard;
pub use fake_tool::{fake_ninja, fake_success_tool};
pub use http::{HttpServer, HttpServerConfig, spawn_http_server, spawn_http_server_with_config};
pub use path_guard::{PathGuard, prepend_dir_to_path};
