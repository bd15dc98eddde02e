// Player data model: regions, tier categories, tier ranks, titles, and
// validation of create/update payloads.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Error returned when a string does not name a known enumeration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

// ── Region ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    NA,
    EU,
    AS,
    OCE,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::NA, Region::EU, Region::AS, Region::OCE];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::NA => "NA",
            Region::EU => "EU",
            Region::AS => "AS",
            Region::OCE => "OCE",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "region",
                value: s.to_string(),
            })
    }
}

// ── Category ─────────────────────────────────────────────────────────

/// A combat discipline a tier can be held in.
///
/// Declaration order is the display order, and also the key order of a
/// serialized tier map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Vanilla,
    Uhc,
    Pot,
    Sword,
    Axe,
    Mace,
    Smp,
    Nethop,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Vanilla,
        Category::Uhc,
        Category::Pot,
        Category::Sword,
        Category::Axe,
        Category::Mace,
        Category::Smp,
        Category::Nethop,
    ];

    /// Key used in JSON payloads and query strings.
    pub fn key(&self) -> &'static str {
        match self {
            Category::Vanilla => "vanilla",
            Category::Uhc => "uhc",
            Category::Pot => "pot",
            Category::Sword => "sword",
            Category::Axe => "axe",
            Category::Mace => "mace",
            Category::Smp => "smp",
            Category::Nethop => "nethop",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Vanilla => "Vanilla",
            Category::Uhc => "UHC",
            Category::Pot => "Pot",
            Category::Sword => "Sword",
            Category::Axe => "Axe",
            Category::Mace => "Mace",
            Category::Smp => "SMP",
            Category::Nethop => "NethOP",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Vanilla => "fas fa-cube",
            Category::Uhc => "fas fa-heart",
            Category::Pot => "fas fa-flask",
            Category::Sword => "fas fa-sword",
            Category::Axe => "fas fa-hammer",
            Category::Mace => "fas fa-gavel",
            Category::Smp => "fas fa-mountain",
            Category::Nethop => "fas fa-fire",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "category",
                value: s.to_string(),
            })
    }
}

// ── Tier ranks ───────────────────────────────────────────────────────

/// Rank label within one category. HT ("high tier") outranks LT at the
/// same number; a lower number outranks a higher one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TierRank {
    #[serde(rename = "HT1")]
    Ht1,
    #[serde(rename = "HT2")]
    Ht2,
    #[serde(rename = "HT3")]
    Ht3,
    #[serde(rename = "HT4")]
    Ht4,
    #[serde(rename = "HT5")]
    Ht5,
    #[serde(rename = "LT1")]
    Lt1,
    #[serde(rename = "LT2")]
    Lt2,
    #[serde(rename = "LT3")]
    Lt3,
    #[serde(rename = "LT4")]
    Lt4,
    #[serde(rename = "LT5")]
    Lt5,
}

impl TierRank {
    pub const ALL: [TierRank; 10] = [
        TierRank::Ht1,
        TierRank::Ht2,
        TierRank::Ht3,
        TierRank::Ht4,
        TierRank::Ht5,
        TierRank::Lt1,
        TierRank::Lt2,
        TierRank::Lt3,
        TierRank::Lt4,
        TierRank::Lt5,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierRank::Ht1 => "HT1",
            TierRank::Ht2 => "HT2",
            TierRank::Ht3 => "HT3",
            TierRank::Ht4 => "HT4",
            TierRank::Ht5 => "HT5",
            TierRank::Lt1 => "LT1",
            TierRank::Lt2 => "LT2",
            TierRank::Lt3 => "LT3",
            TierRank::Lt4 => "LT4",
            TierRank::Lt5 => "LT5",
        }
    }

    pub fn is_high(&self) -> bool {
        self.as_str().starts_with("HT")
    }

    /// Tier number, 1 (best) through 5.
    pub fn level(&self) -> u8 {
        match self {
            TierRank::Ht1 | TierRank::Lt1 => 1,
            TierRank::Ht2 | TierRank::Lt2 => 2,
            TierRank::Ht3 | TierRank::Lt3 => 3,
            TierRank::Ht4 | TierRank::Lt4 => 4,
            TierRank::Ht5 | TierRank::Lt5 => 5,
        }
    }

    /// Position in the strength ordering: 0 for HT1, 1 for LT1, 2 for HT2,
    /// ... 9 for LT5. Smaller is stronger.
    pub fn strength_index(&self) -> u8 {
        (self.level() - 1) * 2 + u8::from(!self.is_high())
    }
}

impl fmt::Display for TierRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierRank {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TierRank::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "tier",
                value: s.to_string(),
            })
    }
}

pub type Tiers = BTreeMap<Category, TierRank>;

// ── Titles ───────────────────────────────────────────────────────────

/// Display rank derived from a point total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Title {
    Grandmaster,
    Master,
    Ace,
    Novice,
}

impl Title {
    pub const ALL: [Title; 4] = [Title::Grandmaster, Title::Master, Title::Ace, Title::Novice];

    pub fn for_points(points: u32) -> Self {
        Title::ALL
            .into_iter()
            .find(|t| points >= t.min_points())
            .unwrap_or(Title::Novice)
    }

    pub fn min_points(&self) -> u32 {
        match self {
            Title::Grandmaster => 400,
            Title::Master => 300,
            Title::Ace => 150,
            Title::Novice => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Title::Grandmaster => "Combat Grandmaster",
            Title::Master => "Combat Master",
            Title::Ace => "Combat Ace",
            Title::Novice => "Combat Novice",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Title::Grandmaster => "fas fa-crown",
            Title::Master => "fas fa-medal",
            Title::Ace => "fas fa-star",
            Title::Novice => "fas fa-shield",
        }
    }
}

// ── Player records ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub points: u32,
    pub region: Region,
    pub title: String,
    pub title_icon: String,
    pub tiers: Tiers,
}

/// A validated create payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlayer {
    pub name: String,
    pub points: u32,
    pub region: Region,
    pub title: String,
    pub title_icon: String,
    pub tiers: Tiers,
}

impl NewPlayer {
    pub fn into_player(self, id: Uuid) -> Player {
        Player {
            id,
            name: self.name,
            points: self.points,
            region: self.region,
            title: self.title,
            title_icon: self.title_icon,
            tiers: self.tiers,
        }
    }
}

/// A validated partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerPatch {
    pub name: Option<String>,
    pub points: Option<u32>,
    pub region: Option<Region>,
    pub title: Option<String>,
    pub title_icon: Option<String>,
    pub tiers: Option<Tiers>,
}

impl Player {
    pub fn apply(&mut self, patch: PlayerPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(points) = patch.points {
            self.points = points;
        }
        if let Some(region) = patch.region {
            self.region = region;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(title_icon) = patch.title_icon {
            self.title_icon = title_icon;
        }
        if let Some(tiers) = patch.tiers {
            self.tiers = tiers;
        }
    }

    /// Case-insensitive name comparison used for uniqueness.
    pub fn has_name(&self, name: &str) -> bool {
        name_key(&self.name) == name_key(name)
    }
}

/// Uniqueness key for a player name: full Unicode lowercase.
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

// ── Validation ───────────────────────────────────────────────────────

/// One offending field. `path` is empty for a problem with the whole body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: Vec<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(path: &[&str], message: impl Into<String>) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
            message: message.into(),
        }
    }

    fn at(message: impl Into<String>) -> Vec<Self> {
        vec![Self::new(&[], message)]
    }
}

type Parsed<T> = Result<T, Vec<FieldError>>;

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_string(value: &Value) -> Parsed<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FieldError::at(format!("Expected string, received {}", type_name(value))))
}

fn parse_name(value: &Value) -> Parsed<String> {
    let name = parse_string(value)?;
    if name.trim().is_empty() {
        return Err(FieldError::at("Name must not be empty"));
    }
    Ok(name)
}

fn parse_points(value: &Value) -> Parsed<u32> {
    let Value::Number(n) = value else {
        return Err(FieldError::at(format!(
            "Expected integer, received {}",
            type_name(value)
        )));
    };
    n.as_u64()
        .and_then(|p| u32::try_from(p).ok())
        .ok_or_else(|| FieldError::at("Points must be a non-negative integer"))
}

fn parse_region(value: &Value) -> Parsed<Region> {
    let raw = parse_string(value)?;
    raw.parse().map_err(|_| {
        FieldError::at(format!(
            "Invalid region '{raw}', expected one of NA, EU, AS, OCE"
        ))
    })
}

fn parse_tiers(value: &Value) -> Parsed<Tiers> {
    let Value::Object(map) = value else {
        return Err(FieldError::at(format!(
            "Expected object, received {}",
            type_name(value)
        )));
    };
    let mut tiers = Tiers::new();
    let mut errors = Vec::new();
    for (key, raw) in map {
        let category = match key.parse::<Category>() {
            Ok(c) => c,
            Err(e) => {
                errors.push(FieldError::new(&[key.as_str()], e.to_string()));
                continue;
            }
        };
        let rank = raw
            .as_str()
            .ok_or_else(|| format!("Expected string, received {}", type_name(raw)))
            .and_then(|s| s.parse::<TierRank>().map_err(|e| e.to_string()));
        match rank {
            Ok(rank) => {
                tiers.insert(category, rank);
            }
            Err(msg) => errors.push(FieldError::new(&[key.as_str()], msg)),
        }
    }
    if errors.is_empty() {
        Ok(tiers)
    } else {
        Err(errors)
    }
}

/// Reads fields out of a JSON object, collecting every problem found.
struct FieldReader<'a> {
    obj: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    fn new(body: &'a Value) -> Result<Self, Vec<FieldError>> {
        match body {
            Value::Object(obj) => Ok(Self {
                obj,
                errors: Vec::new(),
            }),
            other => Err(FieldError::at(format!(
                "Expected object, received {}",
                type_name(other)
            ))),
        }
    }

    fn required<T>(&mut self, key: &str, parse: fn(&Value) -> Parsed<T>) -> Option<T> {
        match self.obj.get(key) {
            Some(value) => self.read(key, value, parse),
            None => {
                self.errors.push(FieldError::new(&[key], "Required"));
                None
            }
        }
    }

    fn optional<T>(&mut self, key: &str, parse: fn(&Value) -> Parsed<T>) -> Option<T> {
        let value = self.obj.get(key)?;
        self.read(key, value, parse)
    }

    fn read<T>(&mut self, key: &str, value: &Value, parse: fn(&Value) -> Parsed<T>) -> Option<T> {
        match parse(value) {
            Ok(v) => Some(v),
            Err(errs) => {
                self.errors.extend(errs.into_iter().map(|mut e| {
                    e.path.insert(0, key.to_string());
                    e
                }));
                None
            }
        }
    }
}

/// Validate a create payload. Unknown keys are ignored.
pub fn validate_new_player(body: &Value) -> Result<NewPlayer, Vec<FieldError>> {
    let mut r = FieldReader::new(body)?;
    let name = r.required("name", parse_name);
    let points = r.required("points", parse_points);
    let region = r.required("region", parse_region);
    let title = r.required("title", parse_string);
    let title_icon = r.required("titleIcon", parse_string);
    let tiers = r.required("tiers", parse_tiers);

    match (name, points, region, title, title_icon, tiers) {
        (Some(name), Some(points), Some(region), Some(title), Some(title_icon), Some(tiers))
            if r.errors.is_empty() =>
        {
            Ok(NewPlayer {
                name,
                points,
                region,
                title,
                title_icon,
                tiers,
            })
        }
        _ => Err(r.errors),
    }
}

/// Validate an update payload: every field optional, `null` rejected.
pub fn validate_player_patch(body: &Value) -> Result<PlayerPatch, Vec<FieldError>> {
    let mut r = FieldReader::new(body)?;
    let patch = PlayerPatch {
        name: r.optional("name", parse_name),
        points: r.optional("points", parse_points),
        region: r.optional("region", parse_region),
        title: r.optional("title", parse_string),
        title_icon: r.optional("titleIcon", parse_string),
        tiers: r.optional("tiers", parse_tiers),
    };
    if r.errors.is_empty() {
        Ok(patch)
    } else {
        Err(r.errors)
    }
}
