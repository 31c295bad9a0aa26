//! Region catalogue and the categorical encoder used by the models.
//!
//! Region ids follow the national statistics office numbering (1..=32).
//! Populations are the 2025 projections.

use serde::{Deserialize, Serialize};

/// Population assumed for ids missing from the catalogue.
pub const DEFAULT_POPULATION: u64 = 100_000;

/// A catalogued region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub id: i64,
    pub name: &'static str,
    pub population: u64,
}

/// All known regions, ordered by id.
pub const REGIONS: [Region; 32] = [
    Region { id: 1, name: "Aguascalientes", population: 1_512_400 },
    Region { id: 2, name: "Baja California", population: 3_968_300 },
    Region { id: 3, name: "Baja California Sur", population: 850_700 },
    Region { id: 4, name: "Campeche", population: 1_011_800 },
    Region { id: 5, name: "Coahuila de Zaragoza", population: 3_328_500 },
    Region { id: 6, name: "Colima", population: 775_100 },
    Region { id: 7, name: "Chiapas", population: 6_000_100 },
    Region { id: 8, name: "Chihuahua", population: 3_998_500 },
    Region { id: 9, name: "Ciudad de México", population: 9_386_700 },
    Region { id: 10, name: "Durango", population: 1_913_400 },
    Region { id: 11, name: "Guanajuato", population: 6_555_200 },
    Region { id: 12, name: "Guerrero", population: 3_724_300 },
    Region { id: 13, name: "Hidalgo", population: 3_327_600 },
    Region { id: 14, name: "Jalisco", population: 8_847_600 },
    Region { id: 15, name: "México", population: 18_016_500 },
    Region { id: 16, name: "Michoacan de Ocampo", population: 4_975_800 },
    Region { id: 17, name: "Morelos", population: 2_056_000 },
    Region { id: 18, name: "Nayarit", population: 1_294_800 },
    Region { id: 19, name: "Nuevo León", population: 6_231_200 },
    Region { id: 20, name: "Oaxaca", population: 4_432_900 },
    Region { id: 21, name: "Puebla", population: 6_886_400 },
    Region { id: 22, name: "Queretaro", population: 2_603_300 },
    Region { id: 23, name: "Quintana Roo", population: 1_989_500 },
    Region { id: 24, name: "San Luis Potosí", population: 2_931_400 },
    Region { id: 25, name: "Sinaloa", population: 3_274_600 },
    Region { id: 26, name: "Sonora", population: 3_154_100 },
    Region { id: 27, name: "Tabasco", population: 2_601_900 },
    Region { id: 28, name: "Tamaulipas", population: 3_682_900 },
    Region { id: 29, name: "Tlaxcala", population: 1_421_000 },
    Region { id: 30, name: "Veracruz de Ignacio de la Llave", population: 8_871_300 },
    Region { id: 31, name: "Yucatan", population: 2_561_900 },
    Region { id: 32, name: "Zacatecas", population: 1_698_200 },
];

/// Look up a catalogued region.
#[must_use]
pub fn find_region(region_id: i64) -> Option<&'static Region> {
    REGIONS.iter().find(|r| r.id == region_id)
}

/// Canonical name used for encoding: the catalogue name, or `"Region {id}"`.
#[must_use]
pub fn canonical_region_name(region_id: i64) -> String {
    find_region(region_id).map_or_else(|| format!("Region {region_id}"), |r| r.name.to_string())
}

/// Population for a region, falling back to [`DEFAULT_POPULATION`].
#[must_use]
pub fn population(region_id: i64) -> u64 {
    find_region(region_id).map_or(DEFAULT_POPULATION, |r| r.population)
}

/// Encoder lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("Region '{0}' is not in the encoder vocabulary")]
    UnknownRegion(String),
}

/// Maps canonical region names to dense integer codes.
///
/// Codes are the index into the sorted vocabulary, so the same set of
/// training regions always yields the same codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEncoder {
    classes: Vec<String>,
}

impl RegionEncoder {
    /// Fit an encoder on a set of names (duplicates allowed).
    #[must_use]
    pub fn fit<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = names.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Encode a name.
    ///
    /// # Errors
    /// Returns `LookupError::UnknownRegion` if the name was not seen during fitting.
    pub fn encode(&self, name: &str) -> Result<u32, LookupError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(name))
            .map(|idx| idx as u32)
            .map_err(|_| LookupError::UnknownRegion(name.to_string()))
    }

    /// Known names in code order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_is_ordered_by_id() {
        for (idx, region) in REGIONS.iter().enumerate() {
            assert_eq!(region.id, idx as i64 + 1);
        }
    }

    #[test]
    fn test_population_lookup() {
        assert_eq!(population(20), 4_432_900);
        assert_eq!(population(99), DEFAULT_POPULATION);
        assert_eq!(canonical_region_name(20), "Oaxaca");
        assert_eq!(canonical_region_name(99), "Region 99");
    }

    #[test]
    fn test_encoder_sorts_and_dedups() {
        let encoder = RegionEncoder::fit(["Oaxaca", "Chiapas", "Oaxaca", "Yucatan"]);
        assert_eq!(encoder.classes(), ["Chiapas", "Oaxaca", "Yucatan"]);
        assert_eq!(encoder.encode("Chiapas"), Ok(0));
        assert_eq!(encoder.encode("Yucatan"), Ok(2));
    }

    #[test]
    fn test_encoder_unknown_name() {
        let encoder = RegionEncoder::fit(["Oaxaca"]);
        assert_eq!(
            encoder.encode("Sonora"),
            Err(LookupError::UnknownRegion("Sonora".to_string()))
        );
        assert!(RegionEncoder::default().is_empty());
    }
}
