//! Display names for known ids. Never consulted when writing.

/// Resource id to name.
pub const RESOURCES: &[(i64, &str)] = &[
    (0, "Food"),
    (1, "Wood"),
    (2, "Ore"),
    (3, "Rare Ore"),
    (4, "Metal"),
    (5, "Electronic Components"),
    (6, "Consumer Goods"),
    (7, "Intellectual Property"),
    (8, "Seedling"),
    (9, "Bag of Soil"),
];

/// Relationship id to NPC name. Gaps are real; unknown ids still round-trip.
pub const NPCS: &[(i64, &str)] = &[
    (0, "Anna"),
    (1, "Officer Olivia"),
    (2, "Chief Franklin"),
    (3, "Barbara"),
    (4, "Shawnathan"),
    (5, "Small Business Owners"),
    (6, "Ethan"),
    (7, "Doctor Denise"),
    (9, "Charles"),
    (10, "Ranger Patrick"),
    (11, "Megan"),
    (12, "Vivian"),
    (13, "Ruby"),
    (50, "Citizens"),
    (54, "Eddie"),
    (75, "Workers"),
];

/// Number of car slots; ids run from 0 to `CAR_SLOTS - 1`.
pub const CAR_SLOTS: i64 = 27;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upgrade {
    pub id: i64,
    pub name: &'static str,
    pub max_level: i64,
}

/// Survival upgrades purchasable with global upgrade points.
pub const SURVIVAL_UPGRADES: &[Upgrade] = &[
    Upgrade { id: 1, name: "Extra Money", max_level: 3 },
    Upgrade { id: 2, name: "Extra Research Points", max_level: 3 },
    Upgrade { id: 3, name: "Extra Lifelines", max_level: 2 },
    Upgrade { id: 4, name: "Reduce Land Costs", max_level: 3 },
    Upgrade { id: 5, name: "Bank Interest", max_level: 3 },
    Upgrade { id: 6, name: "Income Per Tourist", max_level: 3 },
    Upgrade { id: 7, name: "Shipping Export Earnings", max_level: 3 },
    Upgrade { id: 8, name: "Residential Zone Housing", max_level: 3 },
    Upgrade { id: 9, name: "Inflation Reduction", max_level: 3 },
];

fn lookup(table: &[(i64, &'static str)], id: i64) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == id).map(|(_, name)| *name)
}

pub fn resource_name(id: i64) -> String {
    lookup(RESOURCES, id).map_or_else(|| format!("#{id}"), str::to_string)
}

pub fn npc_name(id: i64) -> String {
    lookup(NPCS, id).map_or_else(|| format!("NPC #{id}"), str::to_string)
}

pub fn car_name(id: i64) -> String {
    format!("Car #{id}")
}

pub fn is_known_car(id: i64) -> bool {
    (0..CAR_SLOTS).contains(&id)
}

pub fn upgrade(id: i64) -> Option<&'static Upgrade> {
    SURVIVAL_UPGRADES.iter().find(|u| u.id == id)
}

/// Highest level for an upgrade. Ids the game does not define yet get the
/// common cap of 3.
pub fn upgrade_max_level(id: i64) -> i64 {
    upgrade(id).map_or(3, |u| u.max_level)
}
