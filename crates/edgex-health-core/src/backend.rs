use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// The remote APIs the connector can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendId {
    Consul,
    CoreData,
    ExportClient,
    MetaData,
}

impl BackendId {
    pub const ALL: [Self; 4] = [Self::Consul, Self::CoreData, Self::ExportClient, Self::MetaData];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Consul => "consul",
            Self::CoreData => "coreData",
            Self::ExportClient => "exportClient",
            Self::MetaData => "metaData",
        }
    }
}

impl Display for BackendId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
