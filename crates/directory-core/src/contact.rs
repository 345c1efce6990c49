//! Supplier contacts and the primary-contact rule.

use crate::validation::{self, NAME_MAX, PHONE_MAX};
use crate::{ContactId, SupplierId, ValidationError};
use serde::{Deserialize, Serialize};

/// A person at a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact id.
    pub id: ContactId,
    /// Owning supplier.
    pub supplier_id: SupplierId,
    /// Full name.
    pub name: String,
    /// Email address.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Job title.
    pub title: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Default point of contact for the supplier.
    pub primary_contact: bool,
}

/// Fields for creating a contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDraft {
    /// Owning supplier.
    pub supplier_id: SupplierId,
    /// Full name.
    pub name: String,
    /// Email.
    pub email: Option<String>,
    /// Phone.
    pub phone: Option<String>,
    /// Title.
    pub title: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Primary flag.
    pub primary_contact: bool,
}

impl ContactDraft {
    /// A non-primary draft with only a name.
    pub fn new(supplier_id: SupplierId, name: impl Into<String>) -> Self {
        Self {
            supplier_id,
            name: name.into(),
            email: None,
            phone: None,
            title: None,
            notes: None,
            primary_contact: false,
        }
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Marks the draft as primary.
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary_contact = true;
        self
    }

    /// Checks field rules.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        validation::name(&mut errors, "name", &self.name);
        check_optional(
            &mut errors,
            self.email.as_deref(),
            self.phone.as_deref(),
            self.title.as_deref(),
        );
        errors.into_result()
    }

    /// Materializes the draft under a fresh id.
    #[must_use]
    pub fn into_contact(self, id: ContactId) -> Contact {
        Contact {
            id,
            supplier_id: self.supplier_id,
            name: self.name.trim().to_string(),
            email: self.email,
            phone: self.phone,
            title: self.title,
            notes: self.notes,
            primary_contact: self.primary_contact,
        }
    }
}

/// Partial update of a contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    /// Move to another supplier.
    pub supplier_id: Option<SupplierId>,
    /// Name.
    pub name: Option<String>,
    /// Email.
    pub email: Option<Option<String>>,
    /// Phone.
    pub phone: Option<Option<String>>,
    /// Title.
    pub title: Option<Option<String>>,
    /// Notes.
    pub notes: Option<Option<String>>,
    /// Primary flag.
    pub primary_contact: Option<bool>,
}

impl ContactPatch {
    /// Checks the fields being set.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        if let Some(name) = &self.name {
            validation::name(&mut errors, "name", name);
        }
        check_optional(
            &mut errors,
            self.email.as_ref().and_then(|v| v.as_deref()),
            self.phone.as_ref().and_then(|v| v.as_deref()),
            self.title.as_ref().and_then(|v| v.as_deref()),
        );
        errors.into_result()
    }

    /// Applies the patch in place.
    pub fn apply(&self, contact: &mut Contact) {
        if let Some(supplier_id) = self.supplier_id {
            contact.supplier_id = supplier_id;
        }
        if let Some(name) = &self.name {
            contact.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            contact.email.clone_from(email);
        }
        if let Some(phone) = &self.phone {
            contact.phone.clone_from(phone);
        }
        if let Some(title) = &self.title {
            contact.title.clone_from(title);
        }
        if let Some(notes) = &self.notes {
            contact.notes.clone_from(notes);
        }
        if let Some(primary) = self.primary_contact {
            contact.primary_contact = primary;
        }
    }
}

fn check_optional(
    errors: &mut ValidationError,
    email: Option<&str>,
    phone: Option<&str>,
    title: Option<&str>,
) {
    validation::max_chars(errors, "email", email, NAME_MAX);
    validation::email(errors, "email", email);
    validation::max_chars(errors, "phone", phone, PHONE_MAX);
    validation::max_chars(errors, "title", title, NAME_MAX);
}

/// Filter for listing contacts; the search term travels in
/// [`ListQuery`](crate::ListQuery).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactQuery {
    /// Only contacts of this supplier.
    pub supplier: Option<SupplierId>,
}

/// Demotes every other primary contact of `promoted`'s supplier.
///
/// Does nothing unless `promoted` is present and flagged primary. Returns the
/// ids that were demoted.
pub fn enforce_single_primary(contacts: &mut [Contact], promoted: ContactId) -> Vec<ContactId> {
    let Some(supplier_id) = contacts
        .iter()
        .find(|c| c.id == promoted && c.primary_contact)
        .map(|c| c.supplier_id)
    else {
        return Vec::new();
    };

    let mut demoted = Vec::new();
    for contact in contacts.iter_mut() {
        if contact.supplier_id == supplier_id && contact.id != promoted && contact.primary_contact {
            contact.primary_contact = false;
            demoted.push(contact.id);
        }
    }
    demoted
}

/// Returns the primary contact in a supplier's contact list.
#[must_use]
pub fn primary_of(contacts: &[Contact]) -> Option<&Contact> {
    contacts.iter().find(|c| c.primary_contact)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: i64, supplier: i64, primary: bool) -> Contact {
        let mut draft = ContactDraft::new(SupplierId::new(supplier), format!("Person {id}"));
        draft.primary_contact = primary;
        draft.into_contact(ContactId::new(id))
    }

    #[test]
    fn test_promotion_demotes_siblings_only() {
        let mut contacts = vec![
            contact(1, 10, true),
            contact(2, 10, false),
            contact(3, 20, true),
        ];
        contacts[1].primary_contact = true;

        let demoted = enforce_single_primary(&mut contacts, ContactId::new(2));

        assert_eq!(demoted, vec![ContactId::new(1)]);
        assert!(!contacts[0].primary_contact);
        assert!(contacts[1].primary_contact);
        // other supplier untouched
        assert!(contacts[2].primary_contact);
    }

    #[test]
    fn test_non_primary_write_changes_nothing() {
        let mut contacts = vec![contact(1, 10, true), contact(2, 10, false)];
        let demoted = enforce_single_primary(&mut contacts, ContactId::new(2));
        assert!(demoted.is_empty());
        assert!(contacts[0].primary_contact);
    }

    #[test]
    fn test_primary_of() {
        let contacts = vec![contact(1, 10, false), contact(2, 10, true)];
        assert_eq!(primary_of(&contacts).map(|c| c.id), Some(ContactId::new(2)));
        assert!(primary_of(&contacts[..1]).is_none());
    }

    #[test]
    fn test_draft_validation() {
        let draft = ContactDraft::new(SupplierId::new(1), "Dana").with_email("nope");
        assert!(draft.validate().unwrap_err().has("email"));
        assert!(ContactDraft::new(SupplierId::new(1), "Dana")
            .with_email("dana@coast.ca")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_patch_moves_and_clears() {
        let mut c = contact(1, 10, false);
        c.email = Some("a@b.ca".into());
        ContactPatch {
            supplier_id: Some(SupplierId::new(11)),
            email: Some(None),
            primary_contact: Some(true),
            ..ContactPatch::default()
        }
        .apply(&mut c);
        assert_eq!(c.supplier_id, SupplierId::new(11));
        assert_eq!(c.email, None);
        assert!(c.primary_contact);
    }
}
