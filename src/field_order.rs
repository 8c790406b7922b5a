//! Fixed catalogue of group-by orderings for the collection tree.
//!
//! Each ordering is a sequence of track fields, outermost grouping level first
//! and the terminal `title` level last.

use std::collections::HashSet;

/// Track field that can take part in a grouping order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Artist,
    Album,
    Genre,
    Date,
    TrackNumber, // Sort-only, never creates a tree level
    Title,       // Terminal leaf level
}

/// Icon category shown next to a tree row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Artist,
    Album,
    Genre,
    Year,
    Track,
}

impl Field {
    /// Tag name used by track records for this field.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Artist => "artist",
            Field::Album => "album",
            Field::Genre => "genre",
            Field::Date => "date",
            Field::TrackNumber => "tracknumber",
            Field::Title => "title",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        match name.trim().to_ascii_lowercase().as_str() {
            "artist" => Some(Field::Artist),
            "album" => Some(Field::Album),
            "genre" => Some(Field::Genre),
            "date" => Some(Field::Date),
            "tracknumber" => Some(Field::TrackNumber),
            "title" => Some(Field::Title),
            _ => None,
        }
    }

    /// Whether this field only orders the input and never produces a node.
    pub fn is_sort_only(self) -> bool {
        self == Field::TrackNumber
    }

    pub fn glyph(self) -> Glyph {
        match self {
            Field::Artist => Glyph::Artist,
            Field::Album => Glyph::Album,
            Field::Genre => Glyph::Genre,
            Field::Date => Glyph::Year,
            Field::TrackNumber | Field::Title => Glyph::Track,
        }
    }
}

/// Validated grouping order ending in [`Field::Title`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOrder {
    fields: Vec<Field>,
}

impl FieldOrder {
    /// Builds an order from tag names, rejecting malformed sequences.
    pub fn from_names(names: &[&str]) -> Result<FieldOrder, String> {
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            let field =
                Field::from_name(name).ok_or_else(|| format!("Unknown order field '{}'", name))?;
            fields.push(field);
        }
        Self::from_fields(fields)
    }

    pub fn from_fields(fields: Vec<Field>) -> Result<FieldOrder, String> {
        if fields.is_empty() {
            return Err("Field order must not be empty".to_string());
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(*field) {
                return Err(format!("Field '{}' repeated in order", field.as_str()));
            }
        }
        if fields.last() != Some(&Field::Title) {
            return Err("Field order must end with 'title'".to_string());
        }
        Ok(FieldOrder { fields })
    }

    /// All fields including sort-only ones, as handed to collection search.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Fields that produce tree levels, outermost first.
    pub fn grouping_fields(&self) -> Vec<Field> {
        self.fields
            .iter()
            .copied()
            .filter(|field| !field.is_sort_only())
            .collect()
    }

    /// True when the order holds nothing but the terminal level.
    pub fn is_flat(&self) -> bool {
        self.grouping_fields() == [Field::Title]
    }

    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .map(|field| field.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

impl Default for FieldOrder {
    /// Artist, album, track number, title.
    fn default() -> Self {
        Self {
            fields: vec![Field::Artist, Field::Album, Field::TrackNumber, Field::Title],
        }
    }
}

const FIELD_ORDER_NAMES: [&[&str]; 7] = [
    &["artist", "album", "tracknumber", "title"],
    &["album", "tracknumber", "title"],
    &["genre", "artist", "album", "tracknumber", "title"],
    &["genre", "album", "artist", "tracknumber", "title"],
    &["date", "artist", "album", "tracknumber", "title"],
    &["date", "album", "artist", "tracknumber", "title"],
    &["artist", "date", "album", "tracknumber", "title"],
];

/// Number of selectable views in the catalogue.
pub fn field_order_count() -> usize {
    FIELD_ORDER_NAMES.len()
}

/// Looks up a catalogue entry by its view index.
pub fn field_order(index: usize) -> Option<FieldOrder> {
    let names = FIELD_ORDER_NAMES.get(index)?;
    FieldOrder::from_names(names).ok()
}
