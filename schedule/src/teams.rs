//! Team-name normalization: every spelling a schedule page uses funnels to
//! one canonical nickname per franchise.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// The page used a team spelling the alias table does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTeam(pub String);

impl fmt::Display for UnknownTeam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown team name {:?}", self.0)
    }
}

impl std::error::Error for UnknownTeam {}

/// Normalize a scraped team name to its canonical nickname.
pub fn canonical(name: &str) -> Result<&'static str, UnknownTeam> {
    let name = name.trim();
    alias_table()
        .get(name)
        .copied()
        .ok_or_else(|| UnknownTeam(name.to_owned()))
}

/// Every canonical nickname, in alphabetical order.
pub fn canonical_names() -> &'static [&'static str] {
    CANONICAL
}

fn alias_table() -> &'static HashMap<&'static str, &'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = HashMap::with_capacity(ALIASES.len() + CANONICAL.len());
        for (alias, canon) in ALIASES {
            table.insert(*alias, *canon);
        }
        // A canonical name passes through unchanged, so normalization is
        // idempotent in one hop.
        for canon in CANONICAL {
            table.insert(*canon, *canon);
        }
        table
    })
}

const CANONICAL: &[&str] = &[
    "49ers",
    "Bears",
    "Bengals",
    "Bills",
    "Broncos",
    "Browns",
    "Buccaneers",
    "Cardinals",
    "Chargers",
    "Chiefs",
    "Colts",
    "Cowboys",
    "Dolphins",
    "Eagles",
    "Falcons",
    "Giants",
    "Jaguars",
    "Jets",
    "Lions",
    "Packers",
    "Panthers",
    "Patriots",
    "Raiders",
    "Rams",
    "Ravens",
    "Redskins",
    "Saints",
    "Seahawks",
    "Steelers",
    "Texans",
    "Titans",
    "Vikings",
];

const ALIASES: &[(&str, &str)] = &[
    ("Arizona", "Cardinals"),
    ("Arizona Cardinals", "Cardinals"),
    ("Atlanta", "Falcons"),
    ("Atlanta Falcons", "Falcons"),
    ("Baltimore", "Ravens"),
    ("Baltimore Ravens", "Ravens"),
    ("Buffalo", "Bills"),
    ("Buffalo Bills", "Bills"),
    ("Carolina", "Panthers"),
    ("Carolina Panthers", "Panthers"),
    ("Chicago", "Bears"),
    ("Chicago Bears", "Bears"),
    ("Cincinnati", "Bengals"),
    ("Cincinnati Bengals", "Bengals"),
    ("Cleveland", "Browns"),
    ("Cleveland Browns", "Browns"),
    ("Dallas", "Cowboys"),
    ("Dallas Cowboys", "Cowboys"),
    ("Denver", "Broncos"),
    ("Denver Broncos", "Broncos"),
    ("Detroit", "Lions"),
    ("Detroit Lions", "Lions"),
    ("Green Bay", "Packers"),
    ("Green Bay Packers", "Packers"),
    ("Houston", "Texans"),
    ("Houston Texans", "Texans"),
    ("Indianapolis", "Colts"),
    ("Indianapolis Colts", "Colts"),
    ("Jacksonville", "Jaguars"),
    ("Jacksonville Jaguars", "Jaguars"),
    ("Kansas City", "Chiefs"),
    ("Kansas City Chiefs", "Chiefs"),
    ("Los Angeles", "Rams"),
    ("Los Angeles Rams", "Rams"),
    ("Los Angeles Chargers", "Chargers"),
    ("Miami", "Dolphins"),
    ("Miami Dolphins", "Dolphins"),
    ("Minnesota", "Vikings"),
    ("Minnesota Vikings", "Vikings"),
    ("New England", "Patriots"),
    ("New England Patriots", "Patriots"),
    ("New Orleans", "Saints"),
    ("New Orleans Saints", "Saints"),
    ("NY Giants", "Giants"),
    ("New York Giants", "Giants"),
    ("NY Jets", "Jets"),
    ("New York Jets", "Jets"),
    ("Oakland", "Raiders"),
    ("Oakland Raiders", "Raiders"),
    ("Philadelphia", "Eagles"),
    ("Philadelphia Eagles", "Eagles"),
    ("Pittsburgh", "Steelers"),
    ("Pittsburgh Steelers", "Steelers"),
    ("San Diego", "Chargers"),
    ("San Diego Chargers", "Chargers"),
    ("San Francisco", "49ers"),
    ("San Francisco 49ers", "49ers"),
    ("Seattle", "Seahawks"),
    ("Seattle Seahawks", "Seahawks"),
    ("Tampa Bay", "Buccaneers"),
    ("Tampa Bay Buccaneers", "Buccaneers"),
    ("Tennessee", "Titans"),
    ("Tennessee Titans", "Titans"),
    ("Washington", "Redskins"),
    ("Washington Redskins", "Redskins"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_and_full_name_normalize_to_one_nickname() {
        assert_eq!(canonical("Baltimore"), Ok("Ravens"));
        assert_eq!(canonical("Baltimore Ravens"), Ok("Ravens"));
        assert_eq!(canonical("Green Bay"), Ok("Packers"));
        assert_eq!(canonical("NY Giants"), Ok("Giants"));
        assert_eq!(canonical("New York Giants"), Ok("Giants"));
    }

    #[test]
    fn canonical_names_pass_through_in_one_hop() {
        for name in canonical_names() {
            assert_eq!(canonical(name), Ok(*name));
        }
    }

    #[test]
    fn relocated_franchises_share_a_nickname() {
        assert_eq!(canonical("San Diego"), Ok("Chargers"));
        assert_eq!(canonical("Los Angeles Chargers"), Ok("Chargers"));
        assert_eq!(canonical("Los Angeles"), Ok("Rams"));
    }

    #[test]
    fn every_alias_lands_on_a_canonical_name() {
        for (alias, canon) in ALIASES {
            assert!(
                canonical_names().contains(canon),
                "{alias} maps to {canon}, which is not canonical"
            );
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = canonical("East Rutherford").expect_err("not a team");
        assert_eq!(err, UnknownTeam("East Rutherford".into()));
        assert!(err.to_string().contains("East Rutherford"));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(canonical("  Seattle \n"), Ok("Seahawks"));
    }
}
