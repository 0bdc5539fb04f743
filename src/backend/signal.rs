//! The fixed catalog of signals available on circuit networks. A handful are
//! reserved for the compiler's own machinery: `CHECK` carries tick pulses
//! down the ticker chain, `G`/`S`/`V` address and carry memory-cell traffic,
//! and the letter pool provides temporaries during expression evaluation.

// The catalog is complete even though the compiler only reserves a few
// entries from it.
#![allow(dead_code)]

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Virtual,
    Item,
    Fluid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub name: &'static str,
}

macro_rules! catalog {
    ($($ident:ident = ($kind:ident, $name:literal);)*) => {
        $(
            pub static $ident: Signal = Signal {
                kind: SignalKind::$kind,
                name: $name,
            };
        )*

        /// Every signal in the catalog, reserved ones included.
        pub static CATALOG: &[&Signal] = &[$(&$ident),*];
    };
}

catalog! {
    // Reserved for compiler machinery
    EVERYTHING = (Virtual, "signal-everything");
    EACH = (Virtual, "signal-each");
    ANYTHING = (Virtual, "signal-anything");
    CHECK = (Virtual, "signal-check");
    SIG_G = (Virtual, "signal-G");
    SIG_V = (Virtual, "signal-V");
    SIG_S = (Virtual, "signal-S");

    SIG_0 = (Virtual, "signal-0");
    SIG_1 = (Virtual, "signal-1");
    SIG_2 = (Virtual, "signal-2");
    SIG_3 = (Virtual, "signal-3");
    SIG_4 = (Virtual, "signal-4");
    SIG_5 = (Virtual, "signal-5");
    SIG_6 = (Virtual, "signal-6");
    SIG_7 = (Virtual, "signal-7");
    SIG_8 = (Virtual, "signal-8");
    SIG_9 = (Virtual, "signal-9");
    SIG_A = (Virtual, "signal-A");
    SIG_B = (Virtual, "signal-B");
    SIG_C = (Virtual, "signal-C");
    SIG_D = (Virtual, "signal-D");
    SIG_E = (Virtual, "signal-E");
    SIG_F = (Virtual, "signal-F");
    SIG_H = (Virtual, "signal-H");
    SIG_I = (Virtual, "signal-I");
    SIG_J = (Virtual, "signal-J");
    SIG_K = (Virtual, "signal-K");
    SIG_L = (Virtual, "signal-L");
    SIG_M = (Virtual, "signal-M");
    SIG_N = (Virtual, "signal-N");
    SIG_O = (Virtual, "signal-O");
    SIG_P = (Virtual, "signal-P");
    SIG_Q = (Virtual, "signal-Q");
    SIG_R = (Virtual, "signal-R");
    SIG_T = (Virtual, "signal-T");
    SIG_U = (Virtual, "signal-U");
    SIG_W = (Virtual, "signal-W");
    SIG_X = (Virtual, "signal-X");
    SIG_Y = (Virtual, "signal-Y");
    SIG_Z = (Virtual, "signal-Z");
    SIG_BLACK = (Virtual, "signal-black");
    SIG_BLUE = (Virtual, "signal-blue");
    SIG_CYAN = (Virtual, "signal-cyan");
    SIG_DOT = (Virtual, "signal-dot");
    SIG_GREEN = (Virtual, "signal-green");
    SIG_GREY = (Virtual, "signal-grey");
    SIG_INFO = (Virtual, "signal-info");
    SIG_PINK = (Virtual, "signal-pink");
    SIG_RED = (Virtual, "signal-red");
    SIG_UNKNOWN = (Virtual, "signal-unknown");
    SIG_WHITE = (Virtual, "signal-white");
    SIG_YELLOW = (Virtual, "signal-yellow");

    ACCUMULATOR = (Item, "accumulator");
    ADVANCED_CIRCUIT = (Item, "advanced-circuit");
    ARITHMETIC_COMBINATOR = (Item, "arithmetic-combinator");
    ARTILLERY_TURRET = (Item, "artillery-turret");
    ASSEMBLING_MACHINE_1 = (Item, "assembling-machine-1");
    ASSEMBLING_MACHINE_2 = (Item, "assembling-machine-2");
    ASSEMBLING_MACHINE_3 = (Item, "assembling-machine-3");
    BATTERY = (Item, "battery");
    BATTERY_EQUIPMENT = (Item, "battery-equipment");
    BATTERY_MK2_EQUIPMENT = (Item, "battery-mk2-equipment");
    BEACON = (Item, "beacon");
    BELT_IMMUNITY_EQUIPMENT = (Item, "belt-immunity-equipment");
    BIG_ELECTRIC_POLE = (Item, "big-electric-pole");
    BOILER = (Item, "boiler");
    BURNER_GENERATOR = (Item, "burner-generator");
    BURNER_INSERTER = (Item, "burner-inserter");
    BURNER_MINING_DRILL = (Item, "burner-mining-drill");
    CENTRIFUGE = (Item, "centrifuge");
    CHEMICAL_PLANT = (Item, "chemical-plant");
    COAL = (Item, "coal");
    COIN = (Item, "coin");
    CONCRETE = (Item, "concrete");
    CONSTANT_COMBINATOR = (Item, "constant-combinator");
    CONSTRUCTION_ROBOT = (Item, "construction-robot");
    COPPER_CABLE = (Item, "copper-cable");
    COPPER_ORE = (Item, "copper-ore");
    COPPER_PLATE = (Item, "copper-plate");
    CRUDE_OIL_BARREL = (Item, "crude-oil-barrel");
    DECIDER_COMBINATOR = (Item, "decider-combinator");
    DISCHARGE_DEFENSE_EQUIPMENT = (Item, "discharge-defense-equipment");
    ELECTRIC_ENERGY_INTERFACE = (Item, "electric-energy-interface");
    ELECTRIC_ENGINE_UNIT = (Item, "electric-engine-unit");
    ELECTRIC_FURNACE = (Item, "electric-furnace");
    ELECTRIC_MINING_DRILL = (Item, "electric-mining-drill");
    ELECTRONIC_CIRCUIT = (Item, "electronic-circuit");
    EMPTY_BARREL = (Item, "empty-barrel");
    ENERGY_SHIELD_EQUIPMENT = (Item, "energy-shield-equipment");
    ENERGY_SHIELD_MK2_EQUIPMENT = (Item, "energy-shield-mk2-equipment");
    ENGINE_UNIT = (Item, "engine-unit");
    EXOSKELETON_EQUIPMENT = (Item, "exoskeleton-equipment");
    EXPLOSIVES = (Item, "explosives");
    EXPRESS_LOADER = (Item, "express-loader");
    EXPRESS_SPLITTER = (Item, "express-splitter");
    EXPRESS_TRANSPORT_BELT = (Item, "express-transport-belt");
    EXPRESS_UNDERGROUND_BELT = (Item, "express-underground-belt");
    FAST_INSERTER = (Item, "fast-inserter");
    FAST_LOADER = (Item, "fast-loader");
    FAST_SPLITTER = (Item, "fast-splitter");
    FAST_TRANSPORT_BELT = (Item, "fast-transport-belt");
    FAST_UNDERGROUND_BELT = (Item, "fast-underground-belt");
    FILTER_INSERTER = (Item, "filter-inserter");
    FLAMETHROWER_TURRET = (Item, "flamethrower-turret");
    FLYING_ROBOT_FRAME = (Item, "flying-robot-frame");
    FUSION_REACTOR_EQUIPMENT = (Item, "fusion-reactor-equipment");
    GATE = (Item, "gate");
    GREEN_WIRE = (Item, "green-wire");
    GUN_TURRET = (Item, "gun-turret");
    HAZARD_CONCRETE = (Item, "hazard-concrete");
    HEAT_EXCHANGER = (Item, "heat-exchanger");
    HEAT_INTERFACE = (Item, "heat-interface");
    HEAT_PIPE = (Item, "heat-pipe");
    HEAVY_OIL_BARREL = (Item, "heavy-oil-barrel");
    INFINITY_CHEST = (Item, "infinity-chest");
    INFINITY_PIPE = (Item, "infinity-pipe");
    INSERTER = (Item, "inserter");
    IRON_CHEST = (Item, "iron-chest");
    IRON_GEAR_WHEEL = (Item, "iron-gear-wheel");
    IRON_ORE = (Item, "iron-ore");
    IRON_PLATE = (Item, "iron-plate");
    IRON_STICK = (Item, "iron-stick");
    ITEM_UNKNOWN = (Item, "item-unknown");
    LAB = (Item, "lab");
    LAND_MINE = (Item, "land-mine");
    LANDFILL = (Item, "landfill");
    LASER_TURRET = (Item, "laser-turret");
    LIGHT_OIL_BARREL = (Item, "light-oil-barrel");
    LINKED_BELT = (Item, "linked-belt");
    LINKED_CHEST = (Item, "linked-chest");
    LOADER = (Item, "loader");
    LOGISTIC_CHEST_ACTIVE_PROVIDER = (Item, "logistic-chest-active-provider");
    LOGISTIC_CHEST_BUFFER = (Item, "logistic-chest-buffer");
    LOGISTIC_CHEST_PASSIVE_PROVIDER = (Item, "logistic-chest-passive-provider");
    LOGISTIC_CHEST_REQUESTER = (Item, "logistic-chest-requester");
    LOGISTIC_CHEST_STORAGE = (Item, "logistic-chest-storage");
    LOGISTIC_ROBOT = (Item, "logistic-robot");
    LONG_HANDED_INSERTER = (Item, "long-handed-inserter");
    LOW_DENSITY_STRUCTURE = (Item, "low-density-structure");
    LUBRICANT_BARREL = (Item, "lubricant-barrel");
    MEDIUM_ELECTRIC_POLE = (Item, "medium-electric-pole");
    NIGHT_VISION_EQUIPMENT = (Item, "night-vision-equipment");
    NUCLEAR_FUEL = (Item, "nuclear-fuel");
    NUCLEAR_REACTOR = (Item, "nuclear-reactor");
    OFFSHORE_PUMP = (Item, "offshore-pump");
    OIL_REFINERY = (Item, "oil-refinery");
    PERSONAL_LASER_DEFENSE_EQUIPMENT = (Item, "personal-laser-defense-equipment");
    PERSONAL_ROBOPORT_EQUIPMENT = (Item, "personal-roboport-equipment");
    PERSONAL_ROBOPORT_MK2_EQUIPMENT = (Item, "personal-roboport-mk2-equipment");
    PETROLEUM_GAS_BARREL = (Item, "petroleum-gas-barrel");
    PIPE = (Item, "pipe");
    PIPE_TO_GROUND = (Item, "pipe-to-ground");
    PLASTIC_BAR = (Item, "plastic-bar");
    PLAYER_PORT = (Item, "player-port");
    POWER_SWITCH = (Item, "power-switch");
    PROCESSING_UNIT = (Item, "processing-unit");
    PROGRAMMABLE_SPEAKER = (Item, "programmable-speaker");
    PUMP = (Item, "pump");
    PUMPJACK = (Item, "pumpjack");
    RADAR = (Item, "radar");
    RAIL_CHAIN_SIGNAL = (Item, "rail-chain-signal");
    RAIL_SIGNAL = (Item, "rail-signal");
    RED_WIRE = (Item, "red-wire");
    REFINED_CONCRETE = (Item, "refined-concrete");
    REFINED_HAZARD_CONCRETE = (Item, "refined-hazard-concrete");
    ROBOPORT = (Item, "roboport");
    ROCKET_CONTROL_UNIT = (Item, "rocket-control-unit");
    ROCKET_FUEL = (Item, "rocket-fuel");
    ROCKET_PART = (Item, "rocket-part");
    ROCKET_SILO = (Item, "rocket-silo");
    SATELLITE = (Item, "satellite");
    SIMPLE_ENTITY_WITH_FORCE = (Item, "simple-entity-with-force");
    SIMPLE_ENTITY_WITH_OWNER = (Item, "simple-entity-with-owner");
    SMALL_ELECTRIC_POLE = (Item, "small-electric-pole");
    SMALL_LAMP = (Item, "small-lamp");
    SOLAR_PANEL = (Item, "solar-panel");
    SOLAR_PANEL_EQUIPMENT = (Item, "solar-panel-equipment");
    SOLID_FUEL = (Item, "solid-fuel");
    SPLITTER = (Item, "splitter");
    STACK_FILTER_INSERTER = (Item, "stack-filter-inserter");
    STACK_INSERTER = (Item, "stack-inserter");
    STEAM_ENGINE = (Item, "steam-engine");
    STEAM_TURBINE = (Item, "steam-turbine");
    STEEL_CHEST = (Item, "steel-chest");
    STEEL_FURNACE = (Item, "steel-furnace");
    STEEL_PLATE = (Item, "steel-plate");
    STONE = (Item, "stone");
    STONE_BRICK = (Item, "stone-brick");
    STONE_FURNACE = (Item, "stone-furnace");
    STONE_WALL = (Item, "stone-wall");
    STORAGE_TANK = (Item, "storage-tank");
    SUBSTATION = (Item, "substation");
    SULFUR = (Item, "sulfur");
    SULFURIC_ACID_BARREL = (Item, "sulfuric-acid-barrel");
    TRAIN_STOP = (Item, "train-stop");
    TRANSPORT_BELT = (Item, "transport-belt");
    UNDERGROUND_BELT = (Item, "underground-belt");
    URANIUM_235 = (Item, "uranium-235");
    URANIUM_238 = (Item, "uranium-238");
    URANIUM_FUEL_CELL = (Item, "uranium-fuel-cell");
    URANIUM_ORE = (Item, "uranium-ore");
    USED_UP_URANIUM_FUEL_CELL = (Item, "used-up-uranium-fuel-cell");
    WATER_BARREL = (Item, "water-barrel");
    WOOD = (Item, "wood");
    WOODEN_CHEST = (Item, "wooden-chest");
    ARTILLERY_SHELL = (Item, "artillery-shell");
    ATOMIC_BOMB = (Item, "atomic-bomb");
    CANNON_SHELL = (Item, "cannon-shell");
    EXPLOSIVE_CANNON_SHELL = (Item, "explosive-cannon-shell");
    EXPLOSIVE_ROCKET = (Item, "explosive-rocket");
    EXPLOSIVE_URANIUM_CANNON_SHELL = (Item, "explosive-uranium-cannon-shell");
    FIREARM_MAGAZINE = (Item, "firearm-magazine");
    FLAMETHROWER_AMMO = (Item, "flamethrower-ammo");
    PIERCING_ROUNDS_MAGAZINE = (Item, "piercing-rounds-magazine");
    PIERCING_SHOTGUN_SHELL = (Item, "piercing-shotgun-shell");
    ROCKET = (Item, "rocket");
    SHOTGUN_SHELL = (Item, "shotgun-shell");
    URANIUM_CANNON_SHELL = (Item, "uranium-cannon-shell");
    URANIUM_ROUNDS_MAGAZINE = (Item, "uranium-rounds-magazine");

    CRUDE_OIL = (Fluid, "crude-oil");
    FLUID_UNKNOWN = (Fluid, "fluid-unknown");
    HEAVY_OIL = (Fluid, "heavy-oil");
    LIGHT_OIL = (Fluid, "light-oil");
    LUBRICANT = (Fluid, "lubricant");
    PETROLEUM_GAS = (Fluid, "petroleum-gas");
    STEAM = (Fluid, "steam");
    SULFURIC_ACID = (Fluid, "sulfuric-acid");
    WATER = (Fluid, "water");
}

/// The general-purpose pool evaluation temporaries are drawn from, in a fixed
/// order. Excludes the reserved signals.
pub static POOL: Lazy<Vec<&'static Signal>> = Lazy::new(|| {
    CATALOG
        .iter()
        .copied()
        .filter(|s| !is_reserved(s))
        .collect()
});

pub fn is_reserved(signal: &Signal) -> bool {
    signal == &EVERYTHING
        || signal == &EACH
        || signal == &ANYTHING
        || signal == &CHECK
        || signal == &SIG_G
        || signal == &SIG_V
        || signal == &SIG_S
}

static BY_NAME: Lazy<HashMap<&'static str, &'static Signal>> =
    Lazy::new(|| CATALOG.iter().map(|s| (s.name, *s)).collect());

pub fn lookup(name: &str) -> Option<&'static Signal> {
    BY_NAME.get(name).copied()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn catalog_is_complete_and_unique() {
        assert!(CATALOG.len() > 210);

        let mut names: Vec<_> = CATALOG.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(lookup("signal-A"), Some(&SIG_A));
        assert_eq!(lookup("iron-plate"), Some(&IRON_PLATE));
        assert_eq!(lookup("water"), Some(&WATER));
        assert_eq!(lookup("no-such-signal"), None);
    }

    #[test]
    fn pool_excludes_reserved_signals() {
        assert!(!POOL.iter().any(|s| is_reserved(s)));
        assert!(POOL.contains(&&SIG_A));
    }

    #[test]
    fn signal_serialization_shape() {
        let json = serde_json::to_string(&SIG_A).unwrap();
        assert_eq!(json, r#"{"type":"virtual","name":"signal-A"}"#);
    }
}
