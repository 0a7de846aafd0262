//! Known migrations, ascending by version. Bodies are embedded at build time.

/// One schema change. `sql` may hold several statements and must tolerate re-execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: &'static str,
    pub description: &'static str,
    pub sql: &'static str,
}

pub static MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20250101_120000",
        description: "Initial PhaserAI database schema",
        sql: include_str!("../../migrations/20250101_120000_initial_schema.sql"),
    },
    Migration {
        version: "20250102_143000",
        description: "Add etymology and validation tables",
        sql: include_str!("../../migrations/20250102_143000_etymology_tables.sql"),
    },
    Migration {
        version: "20250103_091500",
        description: "Add user preferences table",
        sql: include_str!("../../migrations/20250103_091500_user_preferences.sql"),
    },
];
