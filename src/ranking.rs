// Leaderboard views: search, region and category filtering over the
// points-ordered player list.

use crate::schema::{Category, Player, Region};

/// Filters accepted by `GET /api/players`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Case-insensitive substring of name, region or title.
    pub search: Option<String>,
    pub region: Option<Region>,
    /// Restrict to players ranked in this category and order by tier.
    pub category: Option<Category>,
}

impl ListFilter {
    fn matches(&self, player: &Player) -> bool {
        if let Some(region) = self.region {
            if player.region != region {
                return false;
            }
        }
        if let Some(category) = self.category {
            if !player.tiers.contains_key(&category) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => {
                let query = query.to_lowercase();
                player.name.to_lowercase().contains(&query)
                    || player.region.as_str().to_lowercase().contains(&query)
                    || player.title.to_lowercase().contains(&query)
            }
        }
    }

    /// Apply to a list already sorted by points descending. With a
    /// category the result is re-sorted by tier strength; the sort is stable
    /// so equal tiers stay in points order.
    pub fn apply(&self, players: Vec<Player>) -> Vec<Player> {
        let mut out: Vec<Player> = players.into_iter().filter(|p| self.matches(p)).collect();
        if let Some(category) = self.category {
            out.sort_by_key(|p| p.tiers.get(&category).map(|t| t.strength_index()));
        }
        out
    }
}
