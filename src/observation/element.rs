//! Measurement codes collected from the daily records.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The measurement types a run collects. See the [GHCN-Daily readme](https://www.ncei.noaa.gov/pub/data/ghcn/daily/readme.txt)
/// for the full list; every other code is dropped while decoding.
pub enum Element {
    Snow,
    Prcp,
    Tmin,
    Tmax,
}

impl Element {
    /// Matches a record's element code. Codes are case-sensitive, as in the archives.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "SNOW" => Some(Element::Snow),
            "PRCP" => Some(Element::Prcp),
            "TMIN" => Some(Element::Tmin),
            "TMAX" => Some(Element::Tmax),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Element::Snow => "SNOW",
            Element::Prcp => "PRCP",
            Element::Tmin => "TMIN",
            Element::Tmax => "TMAX",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
