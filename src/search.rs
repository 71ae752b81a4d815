//! # Search & Pagination Engine
//!
//! Resolves a named contact field, filters a user's contacts by
//! case-insensitive substring match, sorts ascending, and slices a page.
//! Also home to the fixed field tables that keep caller-supplied sort names
//! out of SQL text, for contacts and for the administrator's account
//! listing alike.
//!
//! The filter → sort → paginate ordering is load-bearing: the keyword narrows
//! the set before sorting, and pagination runs last so page boundaries are
//! stable relative to the sorted order.

use crate::model::Contact;

/// The searchable and sortable contact fields.
///
/// Replaces string-keyed field dispatch with a fixed accessor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    /// The contact's first name.
    FirstName,
    /// The contact's last name.
    LastName,
    /// The contact's street address.
    Address,
    /// The contact's phone number.
    PhoneNumber,
}

impl ContactField {
    /// Parse a search parameter name.
    ///
    /// Unknown names yield `None`: the engine answers with an empty result
    /// set rather than an error.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "firstName" => Some(ContactField::FirstName),
            "lastName" => Some(ContactField::LastName),
            "address" => Some(ContactField::Address),
            "phoneNumber" => Some(ContactField::PhoneNumber),
            _ => None,
        }
    }

    /// Parse a sort field name, falling back to first name.
    ///
    /// The fallback is the defined default policy, never an error.
    pub fn parse_sort(name: &str) -> Self {
        Self::parse(name).unwrap_or(ContactField::FirstName)
    }

    /// Accessor for the field's value on a contact.
    pub fn get<'a>(&self, contact: &'a Contact) -> &'a str {
        match self {
            ContactField::FirstName => &contact.first_name,
            ContactField::LastName => &contact.last_name,
            ContactField::Address => &contact.address,
            ContactField::PhoneNumber => &contact.phone_number,
        }
    }

    /// The storage column backing this field.
    ///
    /// Keeping ORDER BY targets behind this table means no caller-supplied
    /// string ever reaches the SQL text.
    pub fn column(&self) -> &'static str {
        match self {
            ContactField::FirstName => "first_name",
            ContactField::LastName => "last_name",
            ContactField::Address => "address",
            ContactField::PhoneNumber => "phone_number",
        }
    }
}

/// The sortable account fields for the administrator's user listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
    /// The account holder's first name.
    FirstName,
    /// The account holder's last name.
    LastName,
    /// The account's email address.
    Email,
}

impl AccountField {
    /// Parse a sort field name, falling back to first name.
    pub fn parse_sort(name: &str) -> Self {
        match name {
            "lastName" => AccountField::LastName,
            "email" => AccountField::Email,
            _ => AccountField::FirstName,
        }
    }

    /// The storage column backing this field.
    pub fn column(&self) -> &'static str {
        match self {
            AccountField::FirstName => "first_name",
            AccountField::LastName => "last_name",
            AccountField::Email => "email",
        }
    }
}

/// Filter, sort, and paginate an owner-scoped contact list.
///
/// `field` selects the match predicate (`None` for an unrecognized search
/// parameter yields an empty result). `keyword` matches as a case-insensitive
/// substring. Sorting is ascending by `sort_by`. Out-of-range `page`/`size`
/// yield an empty page.
pub fn search(
    contacts: Vec<Contact>,
    field: Option<ContactField>,
    keyword: &str,
    sort_by: ContactField,
    page: usize,
    size: usize,
) -> Vec<Contact> {
    let field = match field {
        Some(f) => f,
        None => return Vec::new(),
    };

    let needle = keyword.to_lowercase();
    let mut matched: Vec<Contact> = contacts
        .into_iter()
        .filter(|c| field.get(c).to_lowercase().contains(&needle))
        .collect();

    matched.sort_by(|a, b| sort_by.get(a).cmp(sort_by.get(b)));

    matched
        .into_iter()
        .skip(page.saturating_mul(size))
        .take(size)
        .collect()
}
