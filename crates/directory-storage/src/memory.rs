//! In-memory store.
//!
//! Each call takes one lock over all tables, so every operation is atomic.
//! Calls are counted as backend round trips, which lets tests assert that a
//! handler's store traffic does not grow with the size of a listing.

use crate::{DirectoryStore, StorageError, StorageResult};
use async_trait::async_trait;
use directory_core::contact::enforce_single_primary;
use directory_core::search::{matches, matches_opt};
use directory_core::{
    Category, CategoryDraft, CategoryId, Contact, ContactDraft, ContactId, ContactPatch,
    ContactQuery, ListQuery, NewUser, Page, Supplier, SupplierDetail, SupplierDraft, SupplierId,
    SupplierPatch, User, UserId, Vendor, VendorDetail, VendorDraft, VendorId, VendorPatch,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Default)]
struct Sequences {
    vendor: i64,
    supplier: i64,
    category: i64,
    contact: i64,
    user: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Tables {
    seq: Sequences,
    vendors: BTreeMap<VendorId, Vendor>,
    suppliers: BTreeMap<SupplierId, Supplier>,
    categories: BTreeMap<CategoryId, Category>,
    contacts: BTreeMap<ContactId, Contact>,
    users: BTreeMap<UserId, User>,
    vendor_suppliers: BTreeSet<(VendorId, SupplierId)>,
    vendor_categories: BTreeSet<(VendorId, CategoryId)>,
}

impl Tables {
    fn supplier_detail(&self, supplier: &Supplier) -> SupplierDetail {
        SupplierDetail {
            supplier: supplier.clone(),
            contacts: self
                .contacts
                .values()
                .filter(|c| c.supplier_id == supplier.id)
                .cloned()
                .collect(),
        }
    }

    fn vendor_detail(&self, vendor: &Vendor) -> VendorDetail {
        let suppliers = self
            .vendor_suppliers
            .iter()
            .filter(|(v, _)| *v == vendor.id)
            .filter_map(|(_, s)| self.suppliers.get(s))
            .map(|s| self.supplier_detail(s))
            .collect();
        let categories = self
            .vendor_categories
            .iter()
            .filter(|(v, _)| *v == vendor.id)
            .filter_map(|(_, c)| self.categories.get(c).cloned())
            .collect();
        VendorDetail {
            vendor: vendor.clone(),
            suppliers,
            categories,
        }
    }

    fn vendor_matches(&self, vendor: &Vendor, term: &str) -> bool {
        matches(&vendor.name, term)
            || self
                .vendor_suppliers
                .iter()
                .filter(|(v, _)| *v == vendor.id)
                .filter_map(|(_, s)| self.suppliers.get(s))
                .any(|s| matches(&s.name, term))
            || self
                .vendor_categories
                .iter()
                .filter(|(v, _)| *v == vendor.id)
                .filter_map(|(_, c)| self.categories.get(c))
                .any(|c| matches(&c.name, term))
    }

    fn get_vendor(&self, id: VendorId) -> StorageResult<&Vendor> {
        self.vendors
            .get(&id)
            .ok_or_else(|| StorageError::not_found("Vendor", id))
    }

    fn get_supplier(&self, id: SupplierId) -> StorageResult<&Supplier> {
        self.suppliers
            .get(&id)
            .ok_or_else(|| StorageError::not_found("Supplier", id))
    }

    fn get_category(&self, id: CategoryId) -> StorageResult<&Category> {
        self.categories
            .get(&id)
            .ok_or_else(|| StorageError::not_found("Category", id))
    }

    fn check_links(
        &self,
        supplier_ids: Option<&[SupplierId]>,
        category_ids: Option<&[CategoryId]>,
    ) -> StorageResult<()> {
        if let Some(missing) = supplier_ids
            .unwrap_or_default()
            .iter()
            .find(|id| !self.suppliers.contains_key(*id))
        {
            return Err(StorageError::missing_pk("supplier_ids", missing));
        }
        if let Some(missing) = category_ids
            .unwrap_or_default()
            .iter()
            .find(|id| !self.categories.contains_key(*id))
        {
            return Err(StorageError::missing_pk("category_ids", missing));
        }
        Ok(())
    }

    fn replace_links(
        &mut self,
        vendor: VendorId,
        supplier_ids: Option<&[SupplierId]>,
        category_ids: Option<&[CategoryId]>,
    ) {
        if let Some(ids) = supplier_ids {
            self.vendor_suppliers.retain(|(v, _)| *v != vendor);
            self.vendor_suppliers.extend(ids.iter().map(|s| (vendor, *s)));
        }
        if let Some(ids) = category_ids {
            self.vendor_categories.retain(|(v, _)| *v != vendor);
            self.vendor_categories.extend(ids.iter().map(|c| (vendor, *c)));
        }
    }

    /// Stores a contact and demotes its supplier's other primary contacts.
    fn write_contact(&mut self, contact: Contact) -> StorageResult<Contact> {
        let id = contact.id;
        let supplier_id = contact.supplier_id;
        self.contacts.insert(id, contact);

        let mut siblings: Vec<Contact> = self
            .contacts
            .values()
            .filter(|c| c.supplier_id == supplier_id)
            .cloned()
            .collect();
        for demoted in enforce_single_primary(&mut siblings, id) {
            if let Some(c) = self.contacts.get_mut(&demoted) {
                c.primary_contact = false;
                debug!(contact_id = %demoted, supplier_id = %supplier_id, "Demoted primary contact");
            }
        }
        self.contacts
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Contact", id))
    }

    fn supplier_by_name(&self, name: &str) -> Option<&Supplier> {
        self.suppliers.values().find(|s| s.name == name)
    }

    fn insert_supplier(&mut self, draft: SupplierDraft) -> Supplier {
        let id = SupplierId::new(next(&mut self.seq.supplier));
        let supplier = draft.into_supplier(id);
        self.suppliers.insert(id, supplier.clone());
        supplier
    }
}

/// In-memory [`DirectoryStore`].
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    round_trips: AtomicU64,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls served so far.
    #[must_use]
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// Resets the round-trip counter.
    pub fn reset_round_trips(&self) {
        self.round_trips.store(0, Ordering::SeqCst);
    }

    fn hit(&self) {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("InMemoryStore")
            .field("vendors", &tables.vendors.len())
            .field("suppliers", &tables.suppliers.len())
            .field("contacts", &tables.contacts.len())
            .finish_non_exhaustive()
    }
}

fn total(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

#[async_trait]
impl DirectoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ping(&self) -> StorageResult<()> {
        self.hit();
        Ok(())
    }

    async fn list_vendors(&self, query: &ListQuery) -> StorageResult<Page<VendorDetail>> {
        self.hit();
        let tables = self.tables.read();
        let matching: Vec<&Vendor> = tables
            .vendors
            .values()
            .filter(|v| match &query.search {
                Some(term) => tables.vendor_matches(v, term),
                None => true,
            })
            .collect();
        let count = total(matching.len());
        let items = query
            .window(matching)
            .into_iter()
            .map(|v| tables.vendor_detail(v))
            .collect();
        Ok(Page::new(items, count))
    }

    async fn get_vendor(&self, id: VendorId) -> StorageResult<VendorDetail> {
        self.hit();
        let tables = self.tables.read();
        let vendor = tables.get_vendor(id)?;
        Ok(tables.vendor_detail(vendor))
    }

    async fn create_vendor(&self, draft: VendorDraft) -> StorageResult<VendorDetail> {
        self.hit();
        let mut tables = self.tables.write();
        tables.check_links(Some(draft.supplier_ids.as_slice()), Some(draft.category_ids.as_slice()))?;

        let id = VendorId::new(next(&mut tables.seq.vendor));
        let vendor = Vendor {
            id,
            name: draft.name.trim().to_string(),
        };
        tables.vendors.insert(id, vendor.clone());
        tables.replace_links(
            id,
            Some(draft.supplier_ids.as_slice()),
            Some(draft.category_ids.as_slice()),
        );
        Ok(tables.vendor_detail(&vendor))
    }

    async fn update_vendor(&self, id: VendorId, patch: VendorPatch) -> StorageResult<VendorDetail> {
        self.hit();
        let mut tables = self.tables.write();
        tables.get_vendor(id)?;
        tables.check_links(patch.supplier_ids.as_deref(), patch.category_ids.as_deref())?;

        if let Some(name) = &patch.name {
            if let Some(v) = tables.vendors.get_mut(&id) {
                v.name = name.trim().to_string();
            }
        }
        tables.replace_links(id, patch.supplier_ids.as_deref(), patch.category_ids.as_deref());
        let vendor = tables.get_vendor(id)?.clone();
        Ok(tables.vendor_detail(&vendor))
    }

    async fn delete_vendor(&self, id: VendorId) -> StorageResult<()> {
        self.hit();
        let mut tables = self.tables.write();
        tables
            .vendors
            .remove(&id)
            .ok_or_else(|| StorageError::not_found("Vendor", id))?;
        tables.vendor_suppliers.retain(|(v, _)| *v != id);
        tables.vendor_categories.retain(|(v, _)| *v != id);
        Ok(())
    }

    async fn get_or_create_vendor(&self, name: &str) -> StorageResult<(Vendor, bool)> {
        self.hit();
        let mut tables = self.tables.write();
        if let Some(existing) = tables.vendors.values().find(|v| v.name == name) {
            return Ok((existing.clone(), false));
        }
        let id = VendorId::new(next(&mut tables.seq.vendor));
        let vendor = Vendor {
            id,
            name: name.to_string(),
        };
        tables.vendors.insert(id, vendor.clone());
        Ok((vendor, true))
    }

    async fn add_vendor_supplier(&self, vendor: VendorId, supplier: SupplierId) -> StorageResult<()> {
        self.hit();
        let mut tables = self.tables.write();
        tables.get_vendor(vendor)?;
        tables.get_supplier(supplier)?;
        tables.vendor_suppliers.insert((vendor, supplier));
        Ok(())
    }

    async fn remove_vendor_supplier(&self, vendor: VendorId, supplier: SupplierId) -> StorageResult<()> {
        self.hit();
        let mut tables = self.tables.write();
        tables.get_vendor(vendor)?;
        tables.vendor_suppliers.remove(&(vendor, supplier));
        Ok(())
    }

    async fn add_vendor_category(&self, vendor: VendorId, category: CategoryId) -> StorageResult<()> {
        self.hit();
        let mut tables = self.tables.write();
        tables.get_vendor(vendor)?;
        tables.get_category(category)?;
        tables.vendor_categories.insert((vendor, category));
        Ok(())
    }

    async fn remove_vendor_category(&self, vendor: VendorId, category: CategoryId) -> StorageResult<()> {
        self.hit();
        let mut tables = self.tables.write();
        tables.get_vendor(vendor)?;
        tables.vendor_categories.remove(&(vendor, category));
        Ok(())
    }

    async fn list_suppliers(&self, query: &ListQuery) -> StorageResult<Page<SupplierDetail>> {
        self.hit();
        let tables = self.tables.read();
        let matching: Vec<&Supplier> = tables
            .suppliers
            .values()
            .filter(|s| match &query.search {
                Some(term) => supplier_matches(s, term),
                None => true,
            })
            .collect();
        let count = total(matching.len());
        let items = query
            .window(matching)
            .into_iter()
            .map(|s| tables.supplier_detail(s))
            .collect();
        Ok(Page::new(items, count))
    }

    async fn get_supplier(&self, id: SupplierId) -> StorageResult<SupplierDetail> {
        self.hit();
        let tables = self.tables.read();
        let supplier = tables.get_supplier(id)?;
        Ok(tables.supplier_detail(supplier))
    }

    async fn find_supplier_by_name(&self, name: &str) -> StorageResult<Option<Supplier>> {
        self.hit();
        Ok(self.tables.read().supplier_by_name(name).cloned())
    }

    async fn create_supplier(&self, draft: SupplierDraft) -> StorageResult<SupplierDetail> {
        self.hit();
        let mut tables = self.tables.write();
        let supplier = tables.insert_supplier(draft);
        Ok(tables.supplier_detail(&supplier))
    }

    async fn update_supplier(&self, id: SupplierId, patch: SupplierPatch) -> StorageResult<SupplierDetail> {
        self.hit();
        let mut tables = self.tables.write();
        let supplier = tables
            .suppliers
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("Supplier", id))?;
        patch.apply(supplier);
        let supplier = supplier.clone();
        Ok(tables.supplier_detail(&supplier))
    }

    async fn delete_supplier(&self, id: SupplierId) -> StorageResult<()> {
        self.hit();
        let mut tables = self.tables.write();
        tables
            .suppliers
            .remove(&id)
            .ok_or_else(|| StorageError::not_found("Supplier", id))?;
        tables.vendor_suppliers.retain(|(_, s)| *s != id);
        tables.contacts.retain(|_, c| c.supplier_id != id);
        Ok(())
    }

    async fn get_or_create_supplier(&self, name: &str) -> StorageResult<(Supplier, bool)> {
        self.hit();
        let mut tables = self.tables.write();
        if let Some(existing) = tables.supplier_by_name(name) {
            return Ok((existing.clone(), false));
        }
        Ok((tables.insert_supplier(SupplierDraft::named(name)), true))
    }

    async fn upsert_supplier(&self, name: &str, patch: SupplierPatch) -> StorageResult<(Supplier, bool)> {
        self.hit();
        let mut tables = self.tables.write();
        let existing = tables.supplier_by_name(name).map(|s| s.id);
        let (id, created) = match existing {
            Some(id) => (id, false),
            None => (tables.insert_supplier(SupplierDraft::named(name)).id, true),
        };
        let supplier = tables
            .suppliers
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("Supplier", id))?;
        patch.apply(supplier);
        Ok((supplier.clone(), created))
    }

    async fn list_categories(&self, query: &ListQuery) -> StorageResult<Page<Category>> {
        self.hit();
        let tables = self.tables.read();
        let matching: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| query.search.as_deref().map_or(true, |t| matches(&c.name, t)))
            .cloned()
            .collect();
        let count = total(matching.len());
        Ok(Page::new(query.window(matching), count))
    }

    async fn get_category(&self, id: CategoryId) -> StorageResult<Category> {
        self.hit();
        self.tables.read().get_category(id).cloned()
    }

    async fn create_category(&self, draft: CategoryDraft) -> StorageResult<Category> {
        self.hit();
        let mut tables = self.tables.write();
        let id = CategoryId::new(next(&mut tables.seq.category));
        let category = Category {
            id,
            name: draft.name.trim().to_string(),
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> StorageResult<Category> {
        self.hit();
        let mut tables = self.tables.write();
        let category = tables
            .categories
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("Category", id))?;
        category.name = draft.name.trim().to_string();
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> StorageResult<()> {
        self.hit();
        let mut tables = self.tables.write();
        tables
            .categories
            .remove(&id)
            .ok_or_else(|| StorageError::not_found("Category", id))?;
        tables.vendor_categories.retain(|(_, c)| *c != id);
        Ok(())
    }

    async fn get_or_create_category(&self, name: &str) -> StorageResult<(Category, bool)> {
        self.hit();
        let mut tables = self.tables.write();
        if let Some(existing) = tables.categories.values().find(|c| c.name == name) {
            return Ok((existing.clone(), false));
        }
        let id = CategoryId::new(next(&mut tables.seq.category));
        let category = Category {
            id,
            name: name.to_string(),
        };
        tables.categories.insert(id, category.clone());
        Ok((category, true))
    }

    async fn list_contacts(&self, filter: ContactQuery, query: &ListQuery) -> StorageResult<Page<Contact>> {
        self.hit();
        let tables = self.tables.read();
        let matching: Vec<Contact> = tables
            .contacts
            .values()
            .filter(|c| filter.supplier.map_or(true, |s| c.supplier_id == s))
            .filter(|c| match &query.search {
                Some(term) => matches(&c.name, term) || matches_opt(c.email.as_deref(), term),
                None => true,
            })
            .cloned()
            .collect();
        let count = total(matching.len());
        Ok(Page::new(query.window(matching), count))
    }

    async fn get_contact(&self, id: ContactId) -> StorageResult<Contact> {
        self.hit();
        self.tables
            .read()
            .contacts
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Contact", id))
    }

    async fn create_contact(&self, draft: ContactDraft) -> StorageResult<Contact> {
        self.hit();
        let mut tables = self.tables.write();
        if !tables.suppliers.contains_key(&draft.supplier_id) {
            return Err(StorageError::missing_pk("supplier", draft.supplier_id));
        }
        let id = ContactId::new(next(&mut tables.seq.contact));
        tables.write_contact(draft.into_contact(id))
    }

    async fn update_contact(&self, id: ContactId, patch: ContactPatch) -> StorageResult<Contact> {
        self.hit();
        let mut tables = self.tables.write();
        if let Some(supplier_id) = patch.supplier_id {
            if !tables.suppliers.contains_key(&supplier_id) {
                return Err(StorageError::missing_pk("supplier", supplier_id));
            }
        }
        let mut contact = tables
            .contacts
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Contact", id))?;
        patch.apply(&mut contact);
        tables.write_contact(contact)
    }

    async fn delete_contact(&self, id: ContactId) -> StorageResult<()> {
        self.hit();
        self.tables
            .write()
            .contacts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("Contact", id))
    }

    async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        self.hit();
        let mut tables = self.tables.write();
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StorageError::Conflict(format!(
                "A user with username '{}' already exists",
                user.username
            )));
        }
        let id = UserId::new(next(&mut tables.seq.user));
        let user = user.into_user(id);
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        self.hit();
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_user(&self, id: UserId) -> StorageResult<User> {
        self.hit();
        self.tables
            .read()
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("User", id))
    }
}

fn supplier_matches(s: &Supplier, term: &str) -> bool {
    matches(&s.name, term)
        || [
            &s.contact_name,
            &s.contact_email,
            &s.website,
            &s.phone,
            &s.accounting_email,
            &s.accounting_contact,
            &s.account_number,
        ]
        .into_iter()
        .any(|field| matches_opt(field.as_deref(), term))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        let coast = store.create_supplier(SupplierDraft::named("Coast Music")).await.unwrap();
        let york = store.create_supplier(SupplierDraft::named("Yorkville")).await.unwrap();
        let guitars = store.create_category(CategoryDraft::new("Guitars")).await.unwrap();

        store
            .create_vendor(VendorDraft {
                name: "Fender".into(),
                supplier_ids: vec![coast.supplier.id],
                category_ids: vec![guitars.id],
            })
            .await
            .unwrap();
        store
            .create_vendor(VendorDraft {
                name: "Roland".into(),
                supplier_ids: vec![york.supplier.id, coast.supplier.id],
                category_ids: vec![],
            })
            .await
            .unwrap();
        store.create_vendor(VendorDraft::named("Zildjian")).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_vendor_search_spans_links() {
        let store = seeded().await;

        let by_name = store.list_vendors(&ListQuery::all().with_search("zild")).await.unwrap();
        assert_eq!(by_name.total, 1);

        let by_supplier = store.list_vendors(&ListQuery::all().with_search("COAST")).await.unwrap();
        let names: Vec<_> = by_supplier.items.iter().map(|v| v.vendor.name.as_str()).collect();
        assert_eq!(names, vec!["Fender", "Roland"]);

        let by_category = store.list_vendors(&ListQuery::all().with_search("guitar")).await.unwrap();
        assert_eq!(by_category.items.len(), 1);
        assert_eq!(by_category.items[0].categories[0].name, "Guitars");
    }

    #[tokio::test]
    async fn test_vendor_window_and_total() {
        let store = seeded().await;
        let page = store.list_vendors(&ListQuery::all().with_window(1, 1)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].vendor.name, "Roland");
        assert_eq!(page.items[0].supplier_names(), "Coast Music, Yorkville");
    }

    #[tokio::test]
    async fn test_create_vendor_rejects_unknown_supplier() {
        let store = InMemoryStore::new();
        let err = store
            .create_vendor(VendorDraft {
                name: "Ghost".into(),
                supplier_ids: vec![SupplierId::new(99)],
                category_ids: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidReference(_)));
        assert_eq!(store.list_vendors(&ListQuery::all()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_update_vendor_replaces_links() {
        let store = seeded().await;
        let fender = VendorId::new(1);
        let updated = store
            .update_vendor(
                fender,
                VendorPatch {
                    supplier_ids: Some(vec![SupplierId::new(2)]),
                    ..VendorPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.supplier_names(), "Yorkville");
        // categories untouched
        assert_eq!(updated.categories.len(), 1);
    }

    #[tokio::test]
    async fn test_primary_contact_is_unique() {
        let store = seeded().await;
        let supplier = SupplierId::new(1);

        let first = store
            .create_contact(ContactDraft::new(supplier, "Ann").primary())
            .await
            .unwrap();
        let second = store
            .create_contact(ContactDraft::new(supplier, "Ben").primary())
            .await
            .unwrap();
        assert!(second.primary_contact);
        assert!(!store.get_contact(first.id).await.unwrap().primary_contact);

        // promoting via update demotes again
        store
            .update_contact(
                first.id,
                ContactPatch {
                    primary_contact: Some(true),
                    ..ContactPatch::default()
                },
            )
            .await
            .unwrap();
        let detail = store.get_supplier(supplier).await.unwrap();
        let primaries: Vec<_> = detail.contacts.iter().filter(|c| c.primary_contact).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].id, first.id);
    }

    #[tokio::test]
    async fn test_deleting_primary_does_not_promote() {
        let store = seeded().await;
        let supplier = SupplierId::new(2);
        let primary = store
            .create_contact(ContactDraft::new(supplier, "Ann").primary())
            .await
            .unwrap();
        store.create_contact(ContactDraft::new(supplier, "Ben")).await.unwrap();

        store.delete_contact(primary.id).await.unwrap();
        let detail = store.get_supplier(supplier).await.unwrap();
        assert!(detail.primary_contact().is_none());
        assert_eq!(detail.contacts.len(), 1);
    }

    #[tokio::test]
    async fn test_primary_per_supplier_independent() {
        let store = seeded().await;
        store
            .create_contact(ContactDraft::new(SupplierId::new(1), "Ann").primary())
            .await
            .unwrap();
        store
            .create_contact(ContactDraft::new(SupplierId::new(2), "Ben").primary())
            .await
            .unwrap();
        let page = store.list_contacts(ContactQuery::default(), &ListQuery::all()).await.unwrap();
        assert!(page.items.iter().all(|c| c.primary_contact));
    }

    #[tokio::test]
    async fn test_contact_filters() {
        let store = seeded().await;
        store
            .create_contact(ContactDraft::new(SupplierId::new(1), "Ann").with_email("ann@coast.ca"))
            .await
            .unwrap();
        store.create_contact(ContactDraft::new(SupplierId::new(2), "Ben")).await.unwrap();

        let by_supplier = store
            .list_contacts(
                ContactQuery {
                    supplier: Some(SupplierId::new(2)),
                },
                &ListQuery::all(),
            )
            .await
            .unwrap();
        assert_eq!(by_supplier.items.len(), 1);
        assert_eq!(by_supplier.items[0].name, "Ben");

        let by_email = store
            .list_contacts(ContactQuery::default(), &ListQuery::all().with_search("COAST.CA"))
            .await
            .unwrap();
        assert_eq!(by_email.items.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_supplier_cascades() {
        let store = seeded().await;
        store.create_contact(ContactDraft::new(SupplierId::new(1), "Ann")).await.unwrap();

        store.delete_supplier(SupplierId::new(1)).await.unwrap();

        let fender = store.get_vendor(VendorId::new(1)).await.unwrap();
        assert!(fender.suppliers.is_empty());
        let contacts = store.list_contacts(ContactQuery::default(), &ListQuery::all()).await.unwrap();
        assert_eq!(contacts.total, 0);
    }

    #[tokio::test]
    async fn test_get_or_create_and_upsert() {
        let store = InMemoryStore::new();
        let (a, created) = store.get_or_create_supplier("Coast Music").await.unwrap();
        assert!(created);
        let (b, created) = store.get_or_create_supplier("Coast Music").await.unwrap();
        assert!(!created);
        assert_eq!(a.id, b.id);

        let (updated, created) = store
            .upsert_supplier(
                "Coast Music",
                SupplierPatch {
                    account_active: Some(true),
                    ..SupplierPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(!created);
        assert!(updated.account_active);

        let (_, created) = store.upsert_supplier("New Co", SupplierPatch::default()).await.unwrap();
        assert!(created);
    }

    #[tokio::test]
    async fn test_supplier_search_fields() {
        let store = InMemoryStore::new();
        store
            .create_supplier(SupplierDraft {
                account_number: Some("ACCT-778".into()),
                ..SupplierDraft::named("Alpha")
            })
            .await
            .unwrap();
        store.create_supplier(SupplierDraft::named("Beta")).await.unwrap();

        let page = store.list_suppliers(&ListQuery::all().with_search("acct-778")).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].supplier.name, "Alpha");
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let store = InMemoryStore::new();
        let new_user = || NewUser {
            username: "sam".into(),
            password_hash: "h".into(),
            is_staff: false,
        };
        store.create_user(new_user()).await.unwrap();
        assert!(matches!(
            store.create_user(new_user()).await,
            Err(StorageError::Conflict(_))
        ));
        assert!(store.find_user_by_username("sam").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_round_trips_constant_for_listing() {
        let store = seeded().await;
        store.reset_round_trips();
        store.list_vendors(&ListQuery::all()).await.unwrap();
        assert_eq!(store.round_trips(), 1);
    }
}
