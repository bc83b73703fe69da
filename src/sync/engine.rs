use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// A data type the sync service can synchronize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum SyncEngine {
    History,
    Bookmarks,
    Passwords,
    Tabs,
    Forms,
    CreditCards,
    Addresses,
    /// An engine this crate has no dedicated variant for.
    Other(String),
}

impl SyncEngine {
    /// The engine's name as the sync service spells it.
    pub fn native_name(&self) -> &str {
        match self {
            SyncEngine::History => "history",
            SyncEngine::Bookmarks => "bookmarks",
            SyncEngine::Passwords => "passwords",
            SyncEngine::Tabs => "tabs",
            SyncEngine::Forms => "forms",
            SyncEngine::CreditCards => "creditcards",
            SyncEngine::Addresses => "addresses",
            SyncEngine::Other(name) => name,
        }
    }
}

impl FromStr for SyncEngine {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "history" => SyncEngine::History,
            "bookmarks" => SyncEngine::Bookmarks,
            "passwords" => SyncEngine::Passwords,
            "tabs" => SyncEngine::Tabs,
            "forms" => SyncEngine::Forms,
            "creditcards" => SyncEngine::CreditCards,
            "addresses" => SyncEngine::Addresses,
            other => SyncEngine::Other(other.to_string()),
        })
    }
}

impl fmt::Display for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.native_name())
    }
}

impl From<SyncEngine> for String {
    fn from(engine: SyncEngine) -> Self {
        engine.native_name().to_string()
    }
}
