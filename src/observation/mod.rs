pub mod element;

use crate::{
    config::StationSet,
    error::{Error, Result},
};

pub use element::Element;

/// Number of comma-separated fields in a daily record.
pub const FIELD_COUNT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One station/date/element record from a yearly archive.
pub struct Observation {
    pub station_id: String,
    pub date: String,
    pub element: Element,
    pub value: String,
    pub m_flag: Option<String>,
    pub q_flag: Option<String>,
    pub s_flag: Option<String>,
    pub obs_time: Option<String>,
}

impl Observation {
    /// Parses a record line, returning `None` when the station or element is not collected.
    ///
    /// A line with fewer than [`FIELD_COUNT`] fields is an error whether or not it would
    /// have been kept.
    pub fn from_line(line: &str, stations: &StationSet) -> Result<Option<Self>> {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();

        if parts.len() < FIELD_COUNT {
            return Err(Error::Parse(format!(
                "expected {} fields, found {}: `{}`",
                FIELD_COUNT,
                parts.len(),
                line
            )));
        }

        let station_id = parts[0];
        if !stations.contains(station_id) {
            return Ok(None);
        }
        let Some(element) = Element::from_code(parts[2]) else {
            return Ok(None);
        };

        Ok(Some(Observation {
            station_id: station_id.to_string(),
            date: parts[1].to_string(),
            element,
            value: parts[3].to_string(),
            m_flag: parse_flag(parts[4]),
            q_flag: parse_flag(parts[5]),
            s_flag: parse_flag(parts[6]),
            obs_time: parse_flag(parts[7]),
        }))
    }
}

fn parse_flag(s: &str) -> Option<String> {
    Some(s.to_string()).filter(|v| !v.is_empty())
}

// -- Tests ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;

    fn stations(ids: &[&str]) -> StationSet {
        StationSet::parse(&ids.join(","))
    }

    #[test]
    fn should_parse_matching_line() {
        let line = "USW00003017,20100101,TMAX,150,,,,0700";
        let obs = Observation::from_line(line, &stations(&["USW00003017"]))
            .unwrap()
            .unwrap();

        assert_eq!(obs.station_id, "USW00003017");
        assert_eq!(obs.date, "20100101");
        assert_eq!(obs.element, Element::Tmax);
        assert_eq!(obs.value, "150");
        assert_eq!(obs.m_flag, None);
        assert_eq!(obs.q_flag, None);
        assert_eq!(obs.s_flag, None);
        assert_eq!(obs.obs_time, Some("0700".to_string()));
    }

    #[test]
    fn should_drop_other_stations() {
        let line = "USW00003017,20100101,TMAX,150,,,,0700";
        let obs = Observation::from_line(line, &stations(&["USC00051401"])).unwrap();

        assert!(obs.is_none());
    }

    #[test]
    fn should_drop_uncollected_elements() {
        let line = "USW00003017,20100101,TOBS,150,,,,0700";
        let obs = Observation::from_line(line, &stations(&["USW00003017"])).unwrap();

        assert!(obs.is_none());
    }

    #[test]
    fn should_trim_fields_and_keep_flags() {
        let line = " USC00051401 , 20100102 ,PRCP, 3 ,T, ,7 ,\r";
        let obs = Observation::from_line(line, &stations(&["USC00051401"]))
            .unwrap()
            .unwrap();

        assert_eq!(obs.station_id, "USC00051401");
        assert_eq!(obs.date, "20100102");
        assert_eq!(obs.value, "3");
        assert_eq!(obs.m_flag, Some("T".to_string()));
        assert_eq!(obs.q_flag, None);
        assert_eq!(obs.s_flag, Some("7".to_string()));
        assert_eq!(obs.obs_time, None);
    }

    #[test]
    fn should_reject_short_line_even_when_not_collected() {
        let line = "USW00099999,20100101,TMAX,150";
        let result = Observation::from_line(line, &stations(&["USW00003017"]));

        assert!(matches!(result, Err(Error::Parse(_))));
    }
}
