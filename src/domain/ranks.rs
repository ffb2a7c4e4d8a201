/// Gamification rank ladder. Levels come from the remote consumer that drains
/// tracked time; the backend only maps a level to the highest rank reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    pub min_level: i64,
    pub name: &'static str,
}

pub const RANKS: &[Rank] = &[
    Rank { min_level: 1, name: "Novice" },
    Rank { min_level: 203_000, name: "Novice 2" },
    Rank { min_level: 817_000, name: "Diamond Dog" },
    Rank { min_level: 1_625_000, name: "Gnome Soldier" },
    Rank { min_level: 9_947_000, name: "Outer Heaven Soldier" },
    Rank { min_level: 28_992_000, name: "Militaires Sans Frontières" },
    Rank { min_level: 69_984_000, name: "Fox" },
    Rank { min_level: 101_600_000, name: "Desperado Enforcement LLC" },
    Rank { min_level: 181_999_900, name: "Les Enfants Terribles" },
    Rank { min_level: 280_000_000, name: "FOX HOUND Special Forces" },
    Rank { min_level: 888_000_000, name: "Snake" },
    Rank { min_level: 1_999_999_998, name: "The Boss" },
    Rank { min_level: 2_912_000_000, name: "Venom Snake" },
];

/// Highest rank whose threshold the level has reached; the first rank is the
/// fallback for missing or sub-threshold levels.
pub fn rank_for_level(level: Option<i64>) -> Rank {
    let Some(level) = level else {
        return RANKS[0];
    };
    RANKS
        .iter()
        .rev()
        .find(|rank| level >= rank.min_level)
        .copied()
        .unwrap_or(RANKS[0])
}
