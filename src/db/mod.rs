//! Database module: row models, schema and the tenant-scoped query surface.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database
//! - `sqlite.rs`: the `Storage` handle and pool setup
//! - one file per table family, each adding `impl Storage` methods

pub mod catalogs;
pub mod categorias;
pub mod diarios;
pub mod documentos;
pub mod lancamentos;
pub mod models;
pub mod obras;
pub mod profiles;
pub mod schema;
pub mod sqlite;
pub mod support;

pub use documentos::NewDocumento;
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, Storage};
