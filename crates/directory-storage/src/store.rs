//! The store trait every backend implements.

use crate::StorageResult;
use async_trait::async_trait;
use directory_core::{
    Category, CategoryDraft, CategoryId, Contact, ContactDraft, ContactId, ContactPatch,
    ContactQuery, ListQuery, NewUser, Page, Supplier, SupplierDetail, SupplierDraft, SupplierId,
    SupplierPatch, User, UserId, Vendor, VendorDetail, VendorDraft, VendorId, VendorPatch,
};

/// Persistence for vendors, suppliers, categories, contacts and users.
///
/// List results are ordered by id. Search terms match case-insensitively:
/// vendors by their own name or any linked supplier or category name;
/// suppliers by name, contact fields, website, phone and accounting fields;
/// categories by name; contacts by name or email.
///
/// Contact writes keep at most one primary contact per supplier; promoting
/// a contact demotes the previous primary in the same atomic step.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Returns the backend name.
    fn name(&self) -> &str;

    /// Checks the backend is reachable.
    async fn ping(&self) -> StorageResult<()>;

    // ---- vendors ----

    /// Lists vendors with their suppliers (and their contacts) and categories.
    async fn list_vendors(&self, query: &ListQuery) -> StorageResult<Page<VendorDetail>>;

    /// Loads one vendor.
    async fn get_vendor(&self, id: VendorId) -> StorageResult<VendorDetail>;

    /// Creates a vendor and its links.
    async fn create_vendor(&self, draft: VendorDraft) -> StorageResult<VendorDetail>;

    /// Updates a vendor; link lists in the patch replace the existing links.
    async fn update_vendor(&self, id: VendorId, patch: VendorPatch) -> StorageResult<VendorDetail>;

    /// Deletes a vendor and its links.
    async fn delete_vendor(&self, id: VendorId) -> StorageResult<()>;

    /// Finds a vendor by exact name or creates it. Returns `true` if created.
    async fn get_or_create_vendor(&self, name: &str) -> StorageResult<(Vendor, bool)>;

    /// Links a supplier to a vendor. Linking twice is a no-op.
    async fn add_vendor_supplier(&self, vendor: VendorId, supplier: SupplierId) -> StorageResult<()>;

    /// Unlinks a supplier from a vendor.
    async fn remove_vendor_supplier(&self, vendor: VendorId, supplier: SupplierId) -> StorageResult<()>;

    /// Links a category to a vendor. Linking twice is a no-op.
    async fn add_vendor_category(&self, vendor: VendorId, category: CategoryId) -> StorageResult<()>;

    /// Unlinks a category from a vendor.
    async fn remove_vendor_category(&self, vendor: VendorId, category: CategoryId) -> StorageResult<()>;

    // ---- suppliers ----

    /// Lists suppliers with their contacts.
    async fn list_suppliers(&self, query: &ListQuery) -> StorageResult<Page<SupplierDetail>>;

    /// Loads one supplier.
    async fn get_supplier(&self, id: SupplierId) -> StorageResult<SupplierDetail>;

    /// Finds the oldest supplier with exactly this name.
    async fn find_supplier_by_name(&self, name: &str) -> StorageResult<Option<Supplier>>;

    /// Creates a supplier.
    async fn create_supplier(&self, draft: SupplierDraft) -> StorageResult<SupplierDetail>;

    /// Applies a patch to a supplier.
    async fn update_supplier(&self, id: SupplierId, patch: SupplierPatch) -> StorageResult<SupplierDetail>;

    /// Deletes a supplier, its contacts and its vendor links.
    async fn delete_supplier(&self, id: SupplierId) -> StorageResult<()>;

    /// Finds a supplier by exact name or creates it. Returns `true` if created.
    async fn get_or_create_supplier(&self, name: &str) -> StorageResult<(Supplier, bool)>;

    /// Applies `patch` to the supplier named `name`, creating it first if
    /// needed. Returns `true` if created.
    async fn upsert_supplier(&self, name: &str, patch: SupplierPatch) -> StorageResult<(Supplier, bool)>;

    // ---- categories ----

    /// Lists categories.
    async fn list_categories(&self, query: &ListQuery) -> StorageResult<Page<Category>>;

    /// Loads one category.
    async fn get_category(&self, id: CategoryId) -> StorageResult<Category>;

    /// Creates a category.
    async fn create_category(&self, draft: CategoryDraft) -> StorageResult<Category>;

    /// Renames a category.
    async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> StorageResult<Category>;

    /// Deletes a category and its vendor links.
    async fn delete_category(&self, id: CategoryId) -> StorageResult<()>;

    /// Finds a category by exact name or creates it. Returns `true` if created.
    async fn get_or_create_category(&self, name: &str) -> StorageResult<(Category, bool)>;

    // ---- contacts ----

    /// Lists contacts, optionally for one supplier.
    async fn list_contacts(&self, filter: ContactQuery, query: &ListQuery) -> StorageResult<Page<Contact>>;

    /// Loads one contact.
    async fn get_contact(&self, id: ContactId) -> StorageResult<Contact>;

    /// Creates a contact.
    async fn create_contact(&self, draft: ContactDraft) -> StorageResult<Contact>;

    /// Applies a patch to a contact.
    async fn update_contact(&self, id: ContactId, patch: ContactPatch) -> StorageResult<Contact>;

    /// Deletes a contact. Deleting the primary leaves the supplier without one.
    async fn delete_contact(&self, id: ContactId) -> StorageResult<()>;

    // ---- users ----

    /// Creates a user. Usernames are unique.
    async fn create_user(&self, user: NewUser) -> StorageResult<User>;

    /// Finds a user by username.
    async fn find_user_by_username(&self, username: &str) -> StorageResult<Option<User>>;

    /// Loads one user.
    async fn get_user(&self, id: UserId) -> StorageResult<User>;
}
