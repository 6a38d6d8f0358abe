pub mod billing;
pub mod blob_store;
pub mod category_migration;
pub mod csv_export;
pub mod csv_import;
pub mod metrics;
pub mod notifier;
pub mod obra_cleanup;
pub mod rdo_report;
pub mod realtime_actor;
pub mod support;
pub mod tokens;
