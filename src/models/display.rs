//! Declarative display configuration per entity, for whatever front end
//! renders the catalog's staff listings.

use serde::Serialize;

/// Column title for a computed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedField {
    pub key: &'static str,
    pub label: &'static str,
}

/// Named group of fields on an edit form
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Fieldset {
    pub title: Option<&'static str>,
    pub fields: &'static [&'static str],
}

/// How an entity is listed and edited
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EntityDisplay {
    pub entity: &'static str,
    /// Columns shown in listings, stored or derived
    pub list_display: &'static [&'static str],
    /// Fields offered as listing filters
    pub list_filter: &'static [&'static str],
    /// Related entities edited inline on the detail form
    pub inlines: &'static [&'static str],
    pub fieldsets: &'static [Fieldset],
}

pub const DERIVED_FIELDS: &[DerivedField] = &[
    DerivedField { key: "display_genre", label: "Genre" },
    DerivedField { key: "is_overdue", label: "Overdue" },
    DerivedField { key: "is_on_loan", label: "On loan" },
    DerivedField { key: "label", label: "Name" },
];

pub const GENRE: EntityDisplay = EntityDisplay {
    entity: "genre",
    list_display: &["name"],
    list_filter: &[],
    inlines: &[],
    fieldsets: &[Fieldset { title: None, fields: &["name"] }],
};

pub const LANGUAGE: EntityDisplay = EntityDisplay {
    entity: "language",
    list_display: &["name"],
    list_filter: &[],
    inlines: &[],
    fieldsets: &[Fieldset { title: None, fields: &["name"] }],
};

pub const AUTHOR: EntityDisplay = EntityDisplay {
    entity: "author",
    list_display: &["last_name", "first_name", "date_of_birth", "date_of_death"],
    list_filter: &[],
    inlines: &["book"],
    fieldsets: &[
        Fieldset { title: None, fields: &["first_name", "last_name"] },
        Fieldset { title: Some("Dates"), fields: &["date_of_birth", "date_of_death"] },
    ],
};

pub const BOOK: EntityDisplay = EntityDisplay {
    entity: "book",
    list_display: &["title", "author", "display_genre"],
    list_filter: &["author_id", "genre_id", "language_id"],
    inlines: &["book_instance"],
    fieldsets: &[Fieldset {
        title: None,
        fields: &["title", "author_id", "summary", "isbn", "genre_ids", "language_id"],
    }],
};

pub const BOOK_INSTANCE: EntityDisplay = EntityDisplay {
    entity: "book_instance",
    list_display: &["status", "id", "book", "due_back", "borrower_id"],
    list_filter: &["status", "due_back"],
    inlines: &[],
    fieldsets: &[
        Fieldset { title: None, fields: &["book_id", "imprint", "id"] },
        Fieldset { title: Some("Availability"), fields: &["status", "due_back", "borrower_id"] },
    ],
};

pub const ENTITIES: &[EntityDisplay] = &[GENRE, LANGUAGE, AUTHOR, BOOK, BOOK_INSTANCE];

/// Fixed lookup of the column title for a derived field
pub fn derived_field_label(key: &str) -> Option<&'static str> {
    DERIVED_FIELDS.iter().find(|f| f.key == key).map(|f| f.label)
}

pub fn entity_display(entity: &str) -> Option<&'static EntityDisplay> {
    ENTITIES.iter().find(|e| e.entity == entity)
}
