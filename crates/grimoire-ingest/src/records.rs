//! Structured rule records and their deterministic content rendering.
//!
//! Source collections tag each record with a `category`; known shapes get a
//! typed variant that renders its mechanical fields ahead of the free-text
//! description, unknown shapes fall through to a generic key/value render.

use anyhow::anyhow;
use serde::Deserialize;
use serde_json::Value;

use grimoire_core::sections::title_case;
use grimoire_core::types::LogicalKey;

/// A description field that appears as either one string or a list of
/// paragraphs in source data.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextBlock {
    One(String),
    Many(Vec<String>),
}

impl Default for TextBlock {
    fn default() -> Self {
        TextBlock::Many(Vec::new())
    }
}

impl TextBlock {
    pub fn joined(&self) -> String {
        match self {
            TextBlock::One(s) => s.trim().to_string(),
            TextBlock::Many(v) => {
                v.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect::<Vec<_>>().join("\n")
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.joined().is_empty()
    }
}

/// A number-or-string scalar ("1/2" challenge ratings, numeric hit points).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(f64),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "{s}"),
            Scalar::Number(n) => {
                if (n.fract()).abs() < f64::EPSILON {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
        }
    }
}

/// A named sub-entry such as a monster action or a class feature.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedEntry {
    pub name: String,
    #[serde(default)]
    pub desc: TextBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpellRecord {
    pub name: String,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub casting_time: Option<String>,
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub components: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub desc: TextBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonsterRecord {
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default, rename = "type")]
    pub creature_type: Option<String>,
    #[serde(default)]
    pub challenge_rating: Option<Scalar>,
    #[serde(default)]
    pub armor_class: Option<Scalar>,
    #[serde(default)]
    pub hit_points: Option<Scalar>,
    #[serde(default)]
    pub actions: Vec<NamedEntry>,
    #[serde(default)]
    pub special_abilities: Vec<NamedEntry>,
    #[serde(default)]
    pub desc: TextBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassRecord {
    pub name: String,
    #[serde(default)]
    pub hit_die: Option<Scalar>,
    #[serde(default)]
    pub primary_ability: Option<String>,
    #[serde(default)]
    pub proficiencies: Vec<String>,
    #[serde(default)]
    pub features: Vec<NamedEntry>,
    #[serde(default)]
    pub desc: TextBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EquipmentRecord {
    pub name: String,
    #[serde(default)]
    pub equipment_category: Option<String>,
    #[serde(default)]
    pub cost: Option<Scalar>,
    #[serde(default)]
    pub weight: Option<Scalar>,
    #[serde(default)]
    pub desc: TextBlock,
}

#[derive(Debug, Clone)]
pub struct GenericRecord {
    pub name: String,
    pub category: String,
    pub attributes: serde_json::Map<String, Value>,
}

/// Closed set of record shapes, dispatched by the record's category tag.
#[derive(Debug, Clone)]
pub enum RuleRecord {
    Spell(SpellRecord),
    Monster(MonsterRecord),
    Class(ClassRecord),
    Equipment(EquipmentRecord),
    Generic(GenericRecord),
}

impl RuleRecord {
    /// Parse one raw record. Returns `Ok(None)` for records without a
    /// usable name (those are skipped, not errors).
    pub fn from_value(value: &Value) -> anyhow::Result<Option<Self>> {
        let obj = value.as_object().ok_or_else(|| anyhow!("record is not an object"))?;
        let name = obj.get("name").and_then(Value::as_str).map(str::trim).unwrap_or("");
        if name.is_empty() {
            return Ok(None);
        }
        let category = obj
            .get("category")
            .and_then(Value::as_str)
            .map(|c| c.trim().to_lowercase())
            .unwrap_or_default();
        let record = match category.as_str() {
            "spell" | "spells" => RuleRecord::Spell(serde_json::from_value(value.clone())?),
            "monster" | "monsters" => RuleRecord::Monster(serde_json::from_value(value.clone())?),
            "class" | "classes" => RuleRecord::Class(serde_json::from_value(value.clone())?),
            "equipment" => RuleRecord::Equipment(serde_json::from_value(value.clone())?),
            _ => {
                let mut attributes = obj.clone();
                attributes.remove("name");
                attributes.remove("category");
                RuleRecord::Generic(GenericRecord {
                    name: name.to_string(),
                    category: if category.is_empty() { "generic".to_string() } else { category },
                    attributes,
                })
            }
        };
        Ok(Some(record))
    }

    pub fn name(&self) -> &str {
        match self {
            RuleRecord::Spell(r) => &r.name,
            RuleRecord::Monster(r) => &r.name,
            RuleRecord::Class(r) => &r.name,
            RuleRecord::Equipment(r) => &r.name,
            RuleRecord::Generic(r) => &r.name,
        }
    }

    /// Canonical category, so "spell" and "spells" collide across editions.
    pub fn category(&self) -> &str {
        match self {
            RuleRecord::Spell(_) => "spells",
            RuleRecord::Monster(_) => "monsters",
            RuleRecord::Class(_) => "classes",
            RuleRecord::Equipment(_) => "equipment",
            RuleRecord::Generic(r) => &r.category,
        }
    }

    pub fn logical_key(&self) -> LogicalKey {
        LogicalKey::new(self.category(), self.name())
    }

    /// Deterministic content rendering: mechanical fields first, free text
    /// after, in a fixed order per shape.
    pub fn render(&self) -> String {
        match self {
            RuleRecord::Spell(r) => render_spell(r),
            RuleRecord::Monster(r) => render_monster(r),
            RuleRecord::Class(r) => render_class(r),
            RuleRecord::Equipment(r) => render_equipment(r),
            RuleRecord::Generic(r) => render_generic(r),
        }
    }
}

fn render_spell(r: &SpellRecord) -> String {
    let mut lines = vec![r.name.clone()];
    match (r.level, r.school.as_deref()) {
        (Some(0), Some(school)) => lines.push(format!("{} cantrip", title_case(school))),
        (Some(0), None) => lines.push("Cantrip".to_string()),
        (Some(level), Some(school)) => {
            lines.push(format!("Level {level} {}", school.to_lowercase()));
        }
        (Some(level), None) => lines.push(format!("Level {level}")),
        (None, Some(school)) => lines.push(title_case(school)),
        (None, None) => {}
    }
    if let Some(v) = &r.casting_time {
        lines.push(format!("Casting Time: {v}"));
    }
    if let Some(v) = &r.range {
        lines.push(format!("Range: {v}"));
    }
    if let Some(v) = &r.components {
        lines.push(format!("Components: {v}"));
    }
    if let Some(v) = &r.duration {
        lines.push(format!("Duration: {v}"));
    }
    if !r.desc.is_empty() {
        lines.push(String::new());
        lines.push(r.desc.joined());
    }
    lines.join("\n")
}

fn render_monster(r: &MonsterRecord) -> String {
    let mut lines = vec![r.name.clone()];
    let mut headline = Vec::new();
    if let Some(size) = &r.size {
        headline.push(size.clone());
    }
    if let Some(kind) = &r.creature_type {
        headline.push(kind.clone());
    }
    if !headline.is_empty() {
        lines.push(headline.join(" "));
    }
    if let Some(cr) = &r.challenge_rating {
        lines.push(format!("Challenge Rating: {cr}"));
    }
    if let Some(ac) = &r.armor_class {
        lines.push(format!("Armor Class: {ac}"));
    }
    if let Some(hp) = &r.hit_points {
        lines.push(format!("Hit Points: {hp}"));
    }
    if !r.actions.is_empty() {
        lines.push(String::new());
        lines.push("Actions:".to_string());
        for action in &r.actions {
            lines.push(format!("{}. {}", action.name, action.desc.joined()));
        }
    }
    if !r.special_abilities.is_empty() {
        lines.push(String::new());
        lines.push("Special Abilities:".to_string());
        for ability in &r.special_abilities {
            lines.push(format!("{}. {}", ability.name, ability.desc.joined()));
        }
    }
    if !r.desc.is_empty() {
        lines.push(String::new());
        lines.push(r.desc.joined());
    }
    lines.join("\n")
}

fn render_class(r: &ClassRecord) -> String {
    let mut lines = vec![r.name.clone()];
    if let Some(hit_die) = &r.hit_die {
        let rendered = match hit_die {
            Scalar::Number(_) => format!("d{hit_die}"),
            Scalar::Text(_) => hit_die.to_string(),
        };
        lines.push(format!("Hit Die: {rendered}"));
    }
    if let Some(ability) = &r.primary_ability {
        lines.push(format!("Primary Ability: {ability}"));
    }
    if !r.proficiencies.is_empty() {
        lines.push(format!("Proficiencies: {}", r.proficiencies.join(", ")));
    }
    if !r.features.is_empty() {
        lines.push(String::new());
        lines.push("Features:".to_string());
        for feature in &r.features {
            lines.push(format!("{}. {}", feature.name, feature.desc.joined()));
        }
    }
    if !r.desc.is_empty() {
        lines.push(String::new());
        lines.push(r.desc.joined());
    }
    lines.join("\n")
}

fn render_equipment(r: &EquipmentRecord) -> String {
    let mut lines = vec![r.name.clone()];
    if let Some(category) = &r.equipment_category {
        lines.push(format!("Category: {category}"));
    }
    if let Some(cost) = &r.cost {
        lines.push(format!("Cost: {cost}"));
    }
    if let Some(weight) = &r.weight {
        lines.push(format!("Weight: {weight}"));
    }
    if !r.desc.is_empty() {
        lines.push(String::new());
        lines.push(r.desc.joined());
    }
    lines.join("\n")
}

fn render_generic(r: &GenericRecord) -> String {
    let mut lines = vec![r.name.clone()];
    for (key, value) in &r.attributes {
        if let Some(rendered) = render_scalarish(value) {
            lines.push(format!("{}: {rendered}", title_case(&key.replace('_', " "))));
        }
    }
    lines.join("\n")
}

/// Scalars and lists of scalars render; nested objects are ignored.
fn render_scalarish(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> =
                items.iter().filter_map(render_scalarish).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

/// Lower-case, alphanumeric-only identifier segment ("Ice Storm" ->
/// "ice-storm").
pub fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = true;
    for c in s.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
