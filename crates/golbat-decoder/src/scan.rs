// Area and context scoped processing switches.

use golbat_common::{area_match_with_wildcards, AreaName, Geofences, Location};
use golbat_config::ScanRuleConfig;

/// What a record is allowed to update. Everything defaults to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParameters {
    pub process_pokemon: bool,
    pub process_wild_pokemon: bool,
    pub process_nearby_pokemon: bool,
    pub process_weather: bool,
    pub process_pokestops: bool,
    pub process_gyms: bool,
    pub process_stations: bool,
    pub process_cells: bool,
    pub process_tappables: bool,
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            process_pokemon: true,
            process_wild_pokemon: true,
            process_nearby_pokemon: true,
            process_weather: true,
            process_pokestops: true,
            process_gyms: true,
            process_stations: true,
            process_cells: true,
            process_tappables: true,
        }
    }
}

impl ScanParameters {
    fn from_rule(rule: &ScanRuleConfig) -> Self {
        let on = |flag: Option<bool>| flag.unwrap_or(true);
        Self {
            process_pokemon: on(rule.pokemon),
            process_wild_pokemon: on(rule.wild_pokemon),
            process_nearby_pokemon: on(rule.nearby_pokemon),
            process_weather: on(rule.weather),
            process_pokestops: on(rule.pokestops),
            process_gyms: on(rule.gyms),
            process_stations: on(rule.stations),
            process_cells: on(rule.cells),
            process_tappables: on(rule.tappables),
        }
    }
}

struct ScanRule {
    areas: Vec<AreaName>,
    contexts: Vec<String>,
    parameters: ScanParameters,
}

/// Ordered rule list; the first matching rule wins.
#[derive(Default)]
pub struct ScanRules {
    rules: Vec<ScanRule>,
    geofences: Geofences,
}

impl ScanRules {
    pub fn new(rules: &[ScanRuleConfig], geofences: Geofences) -> Self {
        let rules = rules
            .iter()
            .map(|rule| ScanRule {
                areas: rule.area_names(),
                contexts: rule.context.iter().map(|c| c.to_lowercase()).collect(),
                parameters: ScanParameters::from_rule(rule),
            })
            .collect();
        Self { rules, geofences }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn find(&self, scan_context: &str, location: Location) -> ScanParameters {
        if self.rules.is_empty() {
            return ScanParameters::default();
        }

        let scan_context = scan_context.to_lowercase();
        let mut located: Option<Vec<AreaName>> = None;

        for rule in &self.rules {
            if !rule.contexts.is_empty() && !rule.contexts.contains(&scan_context) {
                continue;
            }
            if !rule.areas.is_empty() {
                let areas = located.get_or_insert_with(|| self.geofences.match_areas(location));
                if !area_match_with_wildcards(areas, &rule.areas) {
                    continue;
                }
            }
            return rule.parameters;
        }
        ScanParameters::default()
    }
}
