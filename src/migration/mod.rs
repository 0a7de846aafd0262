//! Schema migrations: embedded registry, ledger-driven runner, entry-point protocol.

mod lifecycle;
mod registry;
mod runner;

pub use lifecycle::{
    invoke, Action, CallbackBody, CallbackSender, HttpCallback, Invocation, InvocationContext, RequestType, StackEvent,
};
pub use registry::{Migration, MIGRATIONS};
pub use runner::{
    pending, run, status, AppliedMigration, MigrationBackend, MigrationStore, PgLedger, PgMigrations, RunReport, StatusReport,
};

#[cfg(test)]
pub(crate) use runner::fake;
