//! Vendors (brands) and their supplier/category links.

use crate::supplier::SupplierDetail;
use crate::validation;
use crate::{Category, CategoryId, SupplierId, ValidationError, VendorId};
use serde::{Deserialize, Serialize};

/// A vendor record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    /// Vendor id.
    pub id: VendorId,
    /// Display name.
    pub name: String,
}

/// A vendor with its linked suppliers and categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorDetail {
    /// The vendor.
    pub vendor: Vendor,
    /// Linked suppliers, ordered by id.
    pub suppliers: Vec<SupplierDetail>,
    /// Linked categories, ordered by id.
    pub categories: Vec<Category>,
}

impl VendorDetail {
    /// Comma-joined supplier names, as shown in admin listings.
    #[must_use]
    pub fn supplier_names(&self) -> String {
        self.suppliers
            .iter()
            .map(|s| s.supplier.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Fields for creating a vendor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorDraft {
    /// Display name.
    pub name: String,
    /// Suppliers to link.
    pub supplier_ids: Vec<SupplierId>,
    /// Categories to link.
    pub category_ids: Vec<CategoryId>,
}

impl VendorDraft {
    /// A draft with no links.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Checks the name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        validation::name(&mut errors, "name", &self.name);
        errors.into_result()
    }
}

/// Partial update of a vendor. Link lists replace the existing set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorPatch {
    /// New name.
    pub name: Option<String>,
    /// Replacement supplier links.
    pub supplier_ids: Option<Vec<SupplierId>>,
    /// Replacement category links.
    pub category_ids: Option<Vec<CategoryId>>,
}

impl VendorPatch {
    /// Checks the fields being set.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        if let Some(name) = &self.name {
            validation::name(&mut errors, "name", name);
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Supplier;

    #[test]
    fn test_supplier_names() {
        let detail = VendorDetail {
            vendor: Vendor {
                id: VendorId::new(1),
                name: "Fender".into(),
            },
            suppliers: vec![
                SupplierDetail {
                    supplier: Supplier::new(SupplierId::new(1), "Coast Music"),
                    contacts: vec![],
                },
                SupplierDetail {
                    supplier: Supplier::new(SupplierId::new(2), "Yorkville"),
                    contacts: vec![],
                },
            ],
            categories: vec![],
        };
        assert_eq!(detail.supplier_names(), "Coast Music, Yorkville");
    }

    #[test]
    fn test_validation() {
        assert!(VendorDraft::named(" ").validate().is_err());
        assert!(VendorPatch::default().validate().is_ok());
        let patch = VendorPatch {
            name: Some(String::new()),
            ..VendorPatch::default()
        };
        assert!(patch.validate().unwrap_err().has("name"));
    }
}
