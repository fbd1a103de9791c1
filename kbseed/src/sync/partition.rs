use serde_json::{Map, Value};

use super::Locales;
use crate::store::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Article,
    ActionLink,
    Category,
}

impl EntryKind {
    pub fn collection(self) -> Collection {
        match self {
            EntryKind::Article => Collection::Articles,
            EntryKind::ActionLink => Collection::ActionLinks,
            EntryKind::Category => Collection::Categories,
        }
    }

    /// Prefix given to keys derived from a label.
    pub fn key_prefix(self) -> &'static str {
        match self {
            EntryKind::Article => "art:",
            EntryKind::ActionLink => "action:",
            EntryKind::Category => super::keys::CATEGORY_KEY_PREFIX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Owned by the base-locale variant; written only there.
    BaseOnly,
    /// Stored per locale variant.
    Localized,
    /// A relation whose target id differs per locale, so every variant
    /// carries its own value.
    LocaleScoped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// New document in the base locale: every field plus `locale`.
    Create,
    /// Existing base-locale variant.
    UpdateBase,
    /// Non-base variant, whether it exists yet or not.
    UpdateVariant,
}

impl WriteMode {
    pub fn for_update(locales: &Locales) -> Self {
        if locales.is_base() {
            WriteMode::UpdateBase
        } else {
            WriteMode::UpdateVariant
        }
    }

    fn accepts(self, class: FieldClass) -> bool {
        match self {
            WriteMode::Create | WriteMode::UpdateBase => true,
            WriteMode::UpdateVariant => class != FieldClass::BaseOnly,
        }
    }
}

const ARTICLE_FIELDS: &[(&str, FieldClass)] = &[
    ("title", FieldClass::Localized),
    ("body", FieldClass::Localized),
    ("featured", FieldClass::Localized),
    ("path", FieldClass::BaseOnly),
    ("category", FieldClass::LocaleScoped),
    ("external_key", FieldClass::BaseOnly),
];

const ACTION_LINK_FIELDS: &[(&str, FieldClass)] = &[
    ("title", FieldClass::Localized),
    ("description", FieldClass::Localized),
    ("path", FieldClass::BaseOnly),
    ("category", FieldClass::LocaleScoped),
    ("external_key", FieldClass::BaseOnly),
];

const CATEGORY_FIELDS: &[(&str, FieldClass)] = &[
    ("name", FieldClass::Localized),
    ("description", FieldClass::Localized),
    ("external_key", FieldClass::BaseOnly),
];

/// Static split of an entry kind's fields into base-only, localized and
/// locale-scoped. Every write payload goes through [`FieldPartition::payload`].
#[derive(Debug, Clone, Copy)]
pub struct FieldPartition {
    fields: &'static [(&'static str, FieldClass)],
}

impl FieldPartition {
    pub fn for_kind(kind: EntryKind) -> Self {
        let fields = match kind {
            EntryKind::Article => ARTICLE_FIELDS,
            EntryKind::ActionLink => ACTION_LINK_FIELDS,
            EntryKind::Category => CATEGORY_FIELDS,
        };
        Self { fields }
    }

    pub fn class_of(&self, field: &str) -> Option<FieldClass> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, class)| *class)
    }

    /// Picks the fields of `values` that `mode` may write. Fields unknown to
    /// the partition and `null` values are dropped.
    pub fn payload(
        &self,
        values: &Map<String, Value>,
        mode: WriteMode,
        locale: &str,
    ) -> Map<String, Value> {
        let mut payload = Map::new();
        for (name, class) in self.fields {
            if !mode.accepts(*class) {
                continue;
            }
            match values.get(*name) {
                Some(Value::Null) | None => {}
                Some(value) => {
                    payload.insert((*name).to_string(), value.clone());
                }
            }
        }
        if mode == WriteMode::Create {
            payload.insert("locale".to_string(), Value::String(locale.to_string()));
        }
        payload
    }
}
