//! Reference table
//!
//! The encoder that produces the raw component files leaves placeholder bytes
//! at every forward reference and records two kinds of facts here:
//!
//! - **tags**: where a named target lives (`Tag` → [`Position`])
//! - **references**: which site must point at which named target
//!   ([`Position`] → [`Reference`])
//!
//! Tags live in separate namespaces; a heading tag is never visible to a body
//! reference of the same name. The linker consumes the table once per book.

use crate::error::Result;
use crate::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

/// Namespace a reference resolves in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Head,
    Body,
    Index,
    Graphic,
    Sound,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Head => "head",
            Namespace::Body => "body",
            Namespace::Index => "index",
            Namespace::Graphic => "graphic",
            Namespace::Sound => "sound",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a tag definition.
///
/// Index references carry their target block directly and have no tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "ns", content = "name", rename_all = "kebab-case")]
pub enum Tag {
    Head(String),
    Body(String),
    Graphic(String),
    SoundStart(String),
    SoundEnd(String),
}

/// A pending patch target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub namespace: Namespace,
    pub name: String,
}

/// Tag definitions and pending references for one book
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceTable {
    #[serde(with = "pairs")]
    tags: HashMap<Tag, Position>,

    #[serde(with = "pairs")]
    refs: HashMap<Position, Reference>,

    #[serde(default)]
    graphic_formats: HashMap<String, String>,

    #[serde(default)]
    sound_formats: HashMap<String, String>,

    #[serde(default)]
    narrow_chars: HashMap<String, u16>,

    #[serde(default)]
    wide_chars: HashMap<String, u16>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    // Headings

    pub fn put_head_tag(&mut self, name: impl Into<String>, pos: Position) {
        self.tags.insert(Tag::Head(name.into()), pos);
    }

    pub fn has_head_tag(&self, name: &str) -> bool {
        self.tags.contains_key(&Tag::Head(name.to_string()))
    }

    pub fn get_head_tag(&self, name: &str) -> Option<&Position> {
        self.tags.get(&Tag::Head(name.to_string()))
    }

    // Body text

    pub fn put_body_tag(&mut self, name: impl Into<String>, pos: Position) {
        self.tags.insert(Tag::Body(name.into()), pos);
    }

    pub fn has_body_tag(&self, name: &str) -> bool {
        self.tags.contains_key(&Tag::Body(name.to_string()))
    }

    pub fn get_body_tag(&self, name: &str) -> Option<&Position> {
        self.tags.get(&Tag::Body(name.to_string()))
    }

    // Graphics

    pub fn put_graphic_tag(
        &mut self,
        name: impl Into<String>,
        format: impl Into<String>,
        pos: Position,
    ) {
        let name = name.into();
        self.graphic_formats.insert(name.clone(), format.into());
        self.tags.insert(Tag::Graphic(name), pos);
    }

    pub fn has_graphic_tag(&self, name: &str) -> bool {
        self.tags.contains_key(&Tag::Graphic(name.to_string()))
    }

    pub fn get_graphic_tag(&self, name: &str) -> Option<&Position> {
        self.tags.get(&Tag::Graphic(name.to_string()))
    }

    pub fn get_graphic_format(&self, name: &str) -> Option<&str> {
        self.graphic_formats.get(name).map(String::as_str)
    }

    // Sound: one playback range per tag

    pub fn put_sound_tag(
        &mut self,
        name: impl Into<String>,
        format: impl Into<String>,
        start: Position,
        end: Position,
    ) {
        let name = name.into();
        self.sound_formats.insert(name.clone(), format.into());
        self.tags.insert(Tag::SoundStart(name.clone()), start);
        self.tags.insert(Tag::SoundEnd(name), end);
    }

    pub fn has_sound_tag(&self, name: &str) -> bool {
        self.tags.contains_key(&Tag::SoundStart(name.to_string()))
    }

    /// Start and end positions of a sound tag; `None` unless both are defined.
    pub fn get_sound_tag(&self, name: &str) -> Option<(&Position, &Position)> {
        let start = self.tags.get(&Tag::SoundStart(name.to_string()))?;
        let end = self.tags.get(&Tag::SoundEnd(name.to_string()))?;
        Some((start, end))
    }

    pub fn get_sound_format(&self, name: &str) -> Option<&str> {
        self.sound_formats.get(name).map(String::as_str)
    }

    // External characters

    pub fn put_narrow_char(&mut self, name: impl Into<String>, code: u16) {
        self.narrow_chars.insert(name.into(), code);
    }

    pub fn has_narrow_char(&self, name: &str) -> bool {
        self.narrow_chars.contains_key(name)
    }

    pub fn get_narrow_char(&self, name: &str) -> Option<u16> {
        self.narrow_chars.get(name).copied()
    }

    pub fn put_wide_char(&mut self, name: impl Into<String>, code: u16) {
        self.wide_chars.insert(name.into(), code);
    }

    pub fn has_wide_char(&self, name: &str) -> bool {
        self.wide_chars.contains_key(name)
    }

    pub fn get_wide_char(&self, name: &str) -> Option<u16> {
        self.wide_chars.get(name).copied()
    }

    // References

    /// Record a patch site. A later reference at the same site replaces the
    /// earlier one.
    pub fn put_ref(&mut self, pos: Position, namespace: Namespace, name: impl Into<String>) {
        self.refs.insert(
            pos,
            Reference {
                namespace,
                name: name.into(),
            },
        );
    }

    pub fn put_head_ref(&mut self, pos: Position, name: impl Into<String>) {
        self.put_ref(pos, Namespace::Head, name);
    }

    pub fn put_body_ref(&mut self, pos: Position, name: impl Into<String>) {
        self.put_ref(pos, Namespace::Body, name);
    }

    pub fn put_index_ref(&mut self, pos: Position, name: impl Into<String>) {
        self.put_ref(pos, Namespace::Index, name);
    }

    pub fn put_graphic_ref(&mut self, pos: Position, name: impl Into<String>) {
        self.put_ref(pos, Namespace::Graphic, name);
    }

    pub fn put_sound_ref(&mut self, pos: Position, name: impl Into<String>) {
        self.put_ref(pos, Namespace::Sound, name);
    }

    /// All references of one namespace, ordered by site.
    pub fn refs(&self, namespace: Namespace) -> BTreeMap<Position, String> {
        self.refs
            .iter()
            .filter(|(_, r)| r.namespace == namespace)
            .map(|(pos, r)| (pos.clone(), r.name.clone()))
            .collect()
    }

    pub fn get_head_ref(&self) -> BTreeMap<Position, String> {
        self.refs(Namespace::Head)
    }

    pub fn get_body_ref(&self) -> BTreeMap<Position, String> {
        self.refs(Namespace::Body)
    }

    pub fn get_index_ref(&self) -> BTreeMap<Position, String> {
        self.refs(Namespace::Index)
    }

    pub fn get_graphic_ref(&self) -> BTreeMap<Position, String> {
        self.refs(Namespace::Graphic)
    }

    pub fn get_sound_ref(&self) -> BTreeMap<Position, String> {
        self.refs(Namespace::Sound)
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn ref_count(&self) -> usize {
        self.refs.len()
    }

    // Persistence

    /// Load a table written by [`ReferenceTable::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Serialize maps with structured keys as a list of `[key, value]` pairs.
mod pairs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;
    use std::hash::Hash;

    pub fn serialize<K, V, S>(map: &HashMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<HashMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Eq + Hash,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let pairs = Vec::<(K, V)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_are_independent() {
        let mut table = ReferenceTable::new();
        table.put_head_tag("apple", Position::new("head", 0));

        assert!(table.has_head_tag("apple"));
        assert!(!table.has_body_tag("apple"));
        assert!(table.get_body_tag("apple").is_none());
        assert_eq!(table.get_head_tag("apple"), Some(&Position::new("head", 0)));
    }

    #[test]
    fn test_sound_tag_is_a_range() {
        let mut table = ReferenceTable::new();
        table.put_sound_tag(
            "bell",
            "wav",
            Position::new("sound", 100),
            Position::new("sound", 5000),
        );

        assert!(table.has_sound_tag("bell"));
        let (start, end) = table.get_sound_tag("bell").unwrap();
        assert_eq!(start.offset, 100);
        assert_eq!(end.offset, 5000);
        assert_eq!(table.get_sound_format("bell"), Some("wav"));
        assert!(table.get_sound_tag("gong").is_none());
    }

    #[test]
    fn test_graphic_format() {
        let mut table = ReferenceTable::new();
        table.put_graphic_tag("map", "bmp", Position::new("graphic", 64));
        assert_eq!(table.get_graphic_format("map"), Some("bmp"));
        assert_eq!(table.get_graphic_tag("map").unwrap().offset, 64);
    }

    #[test]
    fn test_refs_partitioned_by_namespace() {
        let mut table = ReferenceTable::new();
        table.put_body_ref(Position::new("head", 0), "a");
        table.put_body_ref(Position::new("head", 6), "b");
        table.put_head_ref(Position::new("body", 0), "a");
        table.put_index_ref(Position::new("word.1", 4), "3");
        table.put_sound_ref(Position::new("body", 40), "bell");

        assert_eq!(table.get_body_ref().len(), 2);
        assert_eq!(table.get_head_ref().len(), 1);
        assert_eq!(table.get_index_ref().len(), 1);
        assert_eq!(table.get_graphic_ref().len(), 0);
        assert_eq!(
            table.get_sound_ref().get(&Position::new("body", 40)),
            Some(&"bell".to_string())
        );
    }

    #[test]
    fn test_external_characters() {
        let mut table = ReferenceTable::new();
        table.put_narrow_char("alpha", 0xa121);
        table.put_wide_char("kanji1", 0xb021);

        assert!(table.has_narrow_char("alpha"));
        assert_eq!(table.get_narrow_char("alpha"), Some(0xa121));
        assert_eq!(table.get_narrow_char("kanji1"), None);
        assert_eq!(table.get_wide_char("kanji1"), Some(0xb021));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("refs.json");

        let mut table = ReferenceTable::new();
        table.put_body_tag("entry", Position::new("body", 2050));
        table.put_sound_tag("bell", "wav", Position::new("s", 1), Position::new("s", 2));
        table.put_body_ref(Position::new("head", 0), "entry");
        table.put_wide_char("kanji1", 0xb021);
        table.save(&path).unwrap();

        let loaded = ReferenceTable::load(&path).unwrap();
        assert_eq!(loaded.get_body_tag("entry"), Some(&Position::new("body", 2050)));
        assert!(loaded.has_sound_tag("bell"));
        assert_eq!(loaded.get_body_ref().len(), 1);
        assert_eq!(loaded.get_wide_char("kanji1"), Some(0xb021));
        assert_eq!(loaded.tag_count(), 3);
    }
}
