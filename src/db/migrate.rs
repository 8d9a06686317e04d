use sqlx::SqlitePool;

/// One embedded schema script. Scripts run in list order on every startup.
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "001_catalog",
        sql: include_str!("../../migrations/001_catalog.sql"),
    },
    Migration {
        name: "002_users",
        sql: include_str!("../../migrations/002_users.sql"),
    },
    Migration {
        name: "003_discussions",
        sql: include_str!("../../migrations/003_discussions.sql"),
    },
    Migration {
        name: "004_user_profile",
        sql: include_str!("../../migrations/004_user_profile.sql"),
    },
    Migration {
        name: "005_resource_summary",
        sql: include_str!("../../migrations/005_resource_summary.sql"),
    },
];

/// Errors that mean the script already ran against this database.
const ALREADY_APPLIED_MARKERS: [&str; 3] = [
    "duplicate column",
    "already exists",
    "unique constraint failed",
];

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub applied: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
    pub failed: Vec<(&'static str, String)>,
}

pub async fn run_migrations(pool: &SqlitePool) -> MigrationReport {
    let mut report = MigrationReport::default();

    for migration in MIGRATIONS {
        match sqlx::raw_sql(migration.sql).execute(pool).await {
            Ok(_) => {
                tracing::info!("Migration {} applied", migration.name);
                report.applied.push(migration.name);
            }
            Err(e) if is_already_applied(&e) => {
                tracing::info!("Migration {} already applied: {}", migration.name, e);
                report.skipped.push(migration.name);
            }
            Err(e) => {
                // A failed script does not stop the ones after it.
                tracing::error!("Migration {} failed: {:?}", migration.name, e);
                report.failed.push((migration.name, e.to_string()));
            }
        }
    }

    report
}

fn is_already_applied(err: &sqlx::Error) -> bool {
    let message = err.to_string().to_lowercase();
    ALREADY_APPLIED_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}
