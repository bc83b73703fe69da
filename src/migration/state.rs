use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// A one-time data migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum Migration {
    History,
    Bookmarks,
    Logins,
    OpenTabs,
    FxA,
    Gecko,
    Settings,
    Addons,
    TelemetryIdentifiers,
    SearchEngine,
}

impl Migration {
    pub const ALL: [Migration; 10] = [
        Migration::History,
        Migration::Bookmarks,
        Migration::Logins,
        Migration::OpenTabs,
        Migration::FxA,
        Migration::Gecko,
        Migration::Settings,
        Migration::Addons,
        Migration::TelemetryIdentifiers,
        Migration::SearchEngine,
    ];

    /// Version of the migration code shipped now. A recorded run with a lower
    /// version means the migration has to run again.
    pub fn current_version(self) -> u32 {
        match self {
            Migration::Addons => 2,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Migration::History => "history",
            Migration::Bookmarks => "bookmarks",
            Migration::Logins => "logins",
            Migration::OpenTabs => "open-tabs",
            Migration::FxA => "fxa",
            Migration::Gecko => "gecko",
            Migration::Settings => "settings",
            Migration::Addons => "addons",
            Migration::TelemetryIdentifiers => "telemetry-identifiers",
            Migration::SearchEngine => "search-engine",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown migration '{0}'")]
pub struct UnknownMigration(pub String);

impl FromStr for Migration {
    type Err = UnknownMigration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Migration::ALL
            .into_iter()
            .find(|migration| migration.name() == s)
            .ok_or_else(|| UnknownMigration(s.to_string()))
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Migration> for &'static str {
    fn from(migration: Migration) -> Self {
        migration.name()
    }
}

/// Outcome of running one migration at one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationRun {
    pub version: u32,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationProgress {
    #[default]
    None,
    Migrating,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationState {
    pub progress: MigrationProgress,
    pub results: BTreeMap<Migration, MigrationRun>,
}

impl MigrationState {
    /// Migrations from `wanted` that have not run yet, or last ran at an
    /// older version than the current one. Failed runs at the current version
    /// are not retried.
    pub fn pending(&self, wanted: &[Migration]) -> Vec<Migration> {
        wanted
            .iter()
            .copied()
            .filter(|migration| match self.results.get(migration) {
                Some(run) => migration.current_version() > run.version,
                None => true,
            })
            .collect()
    }
}

impl crate::store::State for MigrationState {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addons_is_at_version_two() {
        assert_eq!(Migration::Addons.current_version(), 2);
        assert_eq!(Migration::History.current_version(), 1);
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for migration in Migration::ALL {
            assert_eq!(migration.name().parse::<Migration>().unwrap(), migration);
        }
        assert_eq!(
            "passwords".parse::<Migration>(),
            Err(UnknownMigration("passwords".to_string()))
        );
    }

    #[test]
    fn pending_skips_runs_at_current_version() {
        let mut state = MigrationState::default();
        state.results.insert(Migration::History, MigrationRun { version: 1, success: false });
        state.results.insert(Migration::Addons, MigrationRun { version: 1, success: true });

        let pending = state.pending(&[Migration::History, Migration::Addons, Migration::Gecko]);
        assert_eq!(pending, vec![Migration::Addons, Migration::Gecko]);
    }

    #[test]
    fn serializes_with_named_keys() {
        let mut state = MigrationState {
            progress: MigrationProgress::Migrating,
            ..MigrationState::default()
        };
        state.results.insert(Migration::OpenTabs, MigrationRun { version: 1, success: true });
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["progress"], "migrating");
        assert_eq!(json["results"]["open-tabs"]["success"], true);
    }
}
