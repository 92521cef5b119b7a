//! Mapping from on-page label text to canonical record keys.
//!
//! A label matches an entry when the label text *contains* the entry's
//! pattern. Entries are tried in order and the first match wins, so more
//! specific patterns must come before patterns they contain.

/// `(label pattern, canonical key)` pairs, in match priority order.
pub const FIELD_MAPPINGS: &[(&str, &str)] = &[
    ("Name/Title", "name"),
    ("Trade mark type", "markType"),
    ("Mark kind", "markKind"),
    ("Application number", "applicationNumber"),
    ("Application date", "applicationDate"),
    ("Application language", "applicationLanguage"),
    ("Registration number", "registrationNumber"),
    ("Registration date", "registrationDate"),
    ("Publication date", "publicationDate"),
    ("Expiry date", "expiryDate"),
    ("Status date", "statusDate"),
    ("Status", "status"),
    ("Office", "office"),
    ("Applicant", "applicant"),
    ("Owner", "owner"),
    ("Representative", "representative"),
    ("Nice class", "niceClasses"),
    ("Vienna class", "viennaClasses"),
    ("Goods and services", "goodsAndServices"),
    ("Priority", "priority"),
];

/// Returns the canonical key for a normalized label, or `None` when no
/// pattern is contained in it.
#[must_use]
pub fn canonical_key(label: &str) -> Option<&'static str> {
    FIELD_MAPPINGS
        .iter()
        .find(|(pattern, _)| label.contains(pattern))
        .map(|(_, key)| *key)
}
