use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Us,
    Eu,
    Ca,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionEndpoints {
    pub api_base: &'static str,
    pub auth_base: &'static str,
    pub grow_base: Option<&'static str>,
}

const REGION_TABLE: &[(Region, RegionEndpoints)] = &[
    (
        Region::Us,
        RegionEndpoints {
            api_base: "https://app.clio.com/api/v4",
            auth_base: "https://app.clio.com",
            grow_base: Some("https://grow.clio.com/api/v1"),
        },
    ),
    (
        Region::Eu,
        RegionEndpoints {
            api_base: "https://eu.app.clio.com/api/v4",
            auth_base: "https://eu.app.clio.com",
            grow_base: Some("https://eu.grow.clio.com/api/v1"),
        },
    ),
    (
        Region::Ca,
        RegionEndpoints {
            api_base: "https://ca.app.clio.com/api/v4",
            auth_base: "https://ca.app.clio.com",
            grow_base: None,
        },
    ),
];

impl Region {
    pub const PRIMARY: Region = Region::Us;

    pub fn all() -> [Region; 3] {
        [Region::Us, Region::Eu, Region::Ca]
    }

    /// Total mapping: unknown or empty names resolve to the primary region.
    pub fn from_name(raw: Option<&str>) -> Region {
        let Some(raw) = raw else {
            return Region::PRIMARY;
        };
        match raw.trim().to_uppercase().as_str() {
            "US" => Region::Us,
            "EU" => Region::Eu,
            "CA" => Region::Ca,
            _ => Region::PRIMARY,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Us => "US",
            Region::Eu => "EU",
            Region::Ca => "CA",
        }
    }

    pub fn endpoints(self) -> RegionEndpoints {
        REGION_TABLE
            .iter()
            .find(|(region, _)| *region == self)
            .map(|(_, endpoints)| *endpoints)
            .unwrap_or(REGION_TABLE[0].1)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
