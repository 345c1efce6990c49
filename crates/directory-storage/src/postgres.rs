//! PostgreSQL store.
//!
//! List calls run a fixed sequence of statements: a count, the page of
//! parents, then one batched query per child relation keyed by
//! `= ANY($1)`. Contact writes demote the previous primary inside the same
//! transaction; the partial unique index on `contacts(supplier_id) WHERE
//! primary_contact` backs the rule at the database level.

use crate::{DirectoryStore, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use directory_core::search::like_pattern;
use directory_core::{
    Category, CategoryDraft, CategoryId, Contact, ContactDraft, ContactId, ContactPatch,
    ContactQuery, EncryptedSecret, ListQuery, NewUser, Page, Supplier, SupplierDetail,
    SupplierDraft, SupplierId, SupplierPatch, User, UserId, Vendor, VendorDetail, VendorDraft,
    VendorId, VendorPatch,
};
use serde::Deserialize;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{FromRow, PgPool, Postgres, Row};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PgStoreConfig {
    /// Connection URL.
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection.
    pub acquire_timeout_secs: u64,
}

impl Default for PgStoreConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/directory".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
        }
    }
}

/// PostgreSQL [`DirectoryStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

// ---- rows ----

#[derive(FromRow)]
struct VendorRow {
    id: i64,
    name: String,
}

impl From<VendorRow> for Vendor {
    fn from(row: VendorRow) -> Self {
        Self {
            id: VendorId::new(row.id),
            name: row.name,
        }
    }
}

#[derive(FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
        }
    }
}

#[derive(FromRow)]
struct SupplierRow {
    id: i64,
    name: String,
    contact_name: Option<String>,
    contact_email: Option<String>,
    website: Option<String>,
    phone: Option<String>,
    website_username: Option<String>,
    website_password: Option<String>,
    minimum_order_amount: Option<String>,
    notes: Option<String>,
    shipping_fees: Option<String>,
    max_delivery_time: Option<String>,
    accounting_email: Option<String>,
    accounting_contact: Option<String>,
    account_number: Option<String>,
    account_active: bool,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Self {
            id: SupplierId::new(row.id),
            name: row.name,
            contact_name: row.contact_name,
            contact_email: row.contact_email,
            website: row.website,
            phone: row.phone,
            website_username: row.website_username,
            website_password: row.website_password.map(EncryptedSecret::from_token),
            minimum_order_amount: row.minimum_order_amount,
            notes: row.notes,
            shipping_fees: row.shipping_fees,
            max_delivery_time: row.max_delivery_time,
            accounting_email: row.accounting_email,
            accounting_contact: row.accounting_contact,
            account_number: row.account_number,
            account_active: row.account_active,
        }
    }
}

#[derive(FromRow)]
struct LinkedSupplierRow {
    vendor_id: i64,
    #[sqlx(flatten)]
    supplier: SupplierRow,
}

#[derive(FromRow)]
struct LinkedCategoryRow {
    vendor_id: i64,
    #[sqlx(flatten)]
    category: CategoryRow,
}

#[derive(FromRow)]
struct ContactRow {
    id: i64,
    supplier_id: i64,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    title: Option<String>,
    notes: Option<String>,
    primary_contact: bool,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Self {
            id: ContactId::new(row.id),
            supplier_id: SupplierId::new(row.supplier_id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            title: row.title,
            notes: row.notes,
            primary_contact: row.primary_contact,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    is_staff: bool,
    is_active: bool,
    date_joined: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::new(row.id),
            username: row.username,
            password_hash: row.password_hash,
            is_staff: row.is_staff,
            is_active: row.is_active,
            date_joined: row.date_joined,
        }
    }
}

// ---- SQL ----

const SUPPLIER_COLUMNS: &str = "s.id, s.name, s.contact_name, s.contact_email, s.website, s.phone, \
     s.website_username, s.website_password, s.minimum_order_amount, s.notes, s.shipping_fees, \
     s.max_delivery_time, s.accounting_email, s.accounting_contact, s.account_number, s.account_active";

const CONTACT_COLUMNS: &str = "id, supplier_id, name, email, phone, title, notes, primary_contact";

const VENDOR_FILTER: &str = "($1::text IS NULL \
     OR v.name ILIKE $1 \
     OR EXISTS (SELECT 1 FROM vendor_suppliers vs JOIN suppliers s ON s.id = vs.supplier_id \
                WHERE vs.vendor_id = v.id AND s.name ILIKE $1) \
     OR EXISTS (SELECT 1 FROM vendor_categories vc JOIN categories c ON c.id = vc.category_id \
                WHERE vc.vendor_id = v.id AND c.name ILIKE $1))";

const SUPPLIER_FILTER: &str = "($1::text IS NULL \
     OR s.name ILIKE $1 OR s.contact_name ILIKE $1 OR s.contact_email ILIKE $1 \
     OR s.website ILIKE $1 OR s.phone ILIKE $1 OR s.accounting_email ILIKE $1 \
     OR s.accounting_contact ILIKE $1 OR s.account_number ILIKE $1)";

const SUPPLIER_INSERT: &str = "INSERT INTO suppliers (name, contact_name, contact_email, website, phone, \
     website_username, website_password, minimum_order_amount, notes, shipping_fees, \
     max_delivery_time, accounting_email, accounting_contact, account_number, account_active) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) RETURNING id";

const SUPPLIER_UPDATE: &str = "UPDATE suppliers SET name = $1, contact_name = $2, contact_email = $3, \
     website = $4, phone = $5, website_username = $6, website_password = $7, \
     minimum_order_amount = $8, notes = $9, shipping_fees = $10, max_delivery_time = $11, \
     accounting_email = $12, accounting_contact = $13, account_number = $14, account_active = $15 \
     WHERE id = $16";

fn bind_supplier<'q>(
    query: Query<'q, Postgres, PgArguments>,
    s: &'q Supplier,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(&s.name)
        .bind(&s.contact_name)
        .bind(&s.contact_email)
        .bind(&s.website)
        .bind(&s.phone)
        .bind(&s.website_username)
        .bind(s.website_password.as_ref().map(EncryptedSecret::as_token))
        .bind(&s.minimum_order_amount)
        .bind(&s.notes)
        .bind(&s.shipping_fees)
        .bind(&s.max_delivery_time)
        .bind(&s.accounting_email)
        .bind(&s.accounting_contact)
        .bind(&s.account_number)
        .bind(s.account_active)
}

fn search_pattern(query: &ListQuery) -> Option<String> {
    query.search.as_deref().map(like_pattern)
}

fn window(query: &ListQuery) -> (Option<i64>, i64) {
    let limit = query.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);
    (limit, offset)
}

fn count(total: i64) -> u64 {
    u64::try_from(total).unwrap_or_default()
}

fn raw_ids<T: Copy + Into<i64>>(ids: &[T]) -> Vec<i64> {
    ids.iter().map(|id| (*id).into()).collect()
}

impl PgStore {
    /// Connects a pool.
    pub async fn connect(config: &PgStoreConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;
        info!(max_connections = config.max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending schema migrations.
    pub async fn migrate(&self) -> StorageResult<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Migrations completed successfully");
        Ok(())
    }

    /// Loads suppliers and contacts for a set of supplier rows.
    async fn supplier_details(&self, rows: Vec<SupplierRow>) -> StorageResult<Vec<SupplierDetail>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut contacts = self.contacts_by_supplier(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let contacts = contacts.remove(&row.id).unwrap_or_default();
                SupplierDetail {
                    supplier: row.into(),
                    contacts,
                }
            })
            .collect())
    }

    async fn contacts_by_supplier(&self, supplier_ids: &[i64]) -> StorageResult<HashMap<i64, Vec<Contact>>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE supplier_id = ANY($1) ORDER BY id");
        let rows: Vec<ContactRow> = sqlx::query_as(&sql)
            .bind(supplier_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<i64, Vec<Contact>> = HashMap::new();
        for row in rows {
            grouped.entry(row.supplier_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    /// Loads links for a page of vendors: suppliers, their contacts and
    /// categories, one statement each.
    async fn vendor_details(&self, rows: Vec<VendorRow>) -> StorageResult<Vec<VendorDetail>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let vendor_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

        let sql = format!(
            "SELECT vs.vendor_id, {SUPPLIER_COLUMNS} FROM vendor_suppliers vs \
             JOIN suppliers s ON s.id = vs.supplier_id \
             WHERE vs.vendor_id = ANY($1) ORDER BY s.id"
        );
        let linked: Vec<LinkedSupplierRow> = sqlx::query_as(&sql)
            .bind(&vendor_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut supplier_ids: Vec<i64> = linked.iter().map(|l| l.supplier.id).collect();
        supplier_ids.sort_unstable();
        supplier_ids.dedup();
        let contacts = if supplier_ids.is_empty() {
            HashMap::new()
        } else {
            self.contacts_by_supplier(&supplier_ids).await?
        };

        let categories: Vec<LinkedCategoryRow> = sqlx::query_as(
            "SELECT vc.vendor_id, c.id, c.name FROM vendor_categories vc \
             JOIN categories c ON c.id = vc.category_id \
             WHERE vc.vendor_id = ANY($1) ORDER BY c.id",
        )
        .bind(&vendor_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut suppliers_by_vendor: HashMap<i64, Vec<SupplierDetail>> = HashMap::new();
        for link in linked {
            let contacts = contacts.get(&link.supplier.id).cloned().unwrap_or_default();
            suppliers_by_vendor
                .entry(link.vendor_id)
                .or_default()
                .push(SupplierDetail {
                    supplier: link.supplier.into(),
                    contacts,
                });
        }
        let mut categories_by_vendor: HashMap<i64, Vec<Category>> = HashMap::new();
        for link in categories {
            categories_by_vendor
                .entry(link.vendor_id)
                .or_default()
                .push(link.category.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| VendorDetail {
                suppliers: suppliers_by_vendor.remove(&row.id).unwrap_or_default(),
                categories: categories_by_vendor.remove(&row.id).unwrap_or_default(),
                vendor: row.into(),
            })
            .collect())
    }

    async fn check_links(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        supplier_ids: Option<&[SupplierId]>,
        category_ids: Option<&[CategoryId]>,
    ) -> StorageResult<()> {
        if let Some(ids) = supplier_ids {
            let wanted = raw_ids(ids);
            let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM suppliers WHERE id = ANY($1)")
                .bind(&wanted)
                .fetch_all(&mut **tx)
                .await?;
            if let Some(missing) = wanted.iter().find(|id| !found.contains(id)) {
                return Err(StorageError::missing_pk("supplier_ids", missing));
            }
        }
        if let Some(ids) = category_ids {
            let wanted = raw_ids(ids);
            let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ANY($1)")
                .bind(&wanted)
                .fetch_all(&mut **tx)
                .await?;
            if let Some(missing) = wanted.iter().find(|id| !found.contains(id)) {
                return Err(StorageError::missing_pk("category_ids", missing));
            }
        }
        Ok(())
    }

    async fn replace_links(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        vendor: i64,
        supplier_ids: Option<&[SupplierId]>,
        category_ids: Option<&[CategoryId]>,
    ) -> StorageResult<()> {
        if let Some(ids) = supplier_ids {
            sqlx::query("DELETE FROM vendor_suppliers WHERE vendor_id = $1")
                .bind(vendor)
                .execute(&mut **tx)
                .await?;
            sqlx::query(
                "INSERT INTO vendor_suppliers (vendor_id, supplier_id) \
                 SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
            )
            .bind(vendor)
            .bind(raw_ids(ids))
            .execute(&mut **tx)
            .await?;
        }
        if let Some(ids) = category_ids {
            sqlx::query("DELETE FROM vendor_categories WHERE vendor_id = $1")
                .bind(vendor)
                .execute(&mut **tx)
                .await?;
            sqlx::query(
                "INSERT INTO vendor_categories (vendor_id, category_id) \
                 SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
            )
            .bind(vendor)
            .bind(raw_ids(ids))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn lock_supplier(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        predicate: &str,
        value: impl for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    ) -> StorageResult<Option<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers s WHERE {predicate} ORDER BY s.id LIMIT 1 FOR UPDATE");
        let row: Option<SupplierRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.map(Supplier::from))
    }

    async fn insert_supplier(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        draft: SupplierDraft,
    ) -> StorageResult<Supplier> {
        let mut supplier = draft.into_supplier(SupplierId::new(0));
        let row = bind_supplier(sqlx::query(SUPPLIER_INSERT), &supplier)
            .fetch_one(&mut **tx)
            .await?;
        supplier.id = SupplierId::new(row.try_get("id")?);
        Ok(supplier)
    }

    async fn save_supplier(tx: &mut sqlx::Transaction<'_, Postgres>, supplier: &Supplier) -> StorageResult<()> {
        bind_supplier(sqlx::query(SUPPLIER_UPDATE), supplier)
            .bind(supplier.id.get())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Clears the primary flag on every other contact of `supplier`.
    async fn demote_primaries(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        supplier: SupplierId,
        keep: Option<ContactId>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE contacts SET primary_contact = FALSE \
             WHERE supplier_id = $1 AND primary_contact AND ($2::bigint IS NULL OR id <> $2)",
        )
        .bind(supplier.get())
        .bind(keep.map(ContactId::get))
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() > 0 {
            debug!(supplier_id = %supplier, demoted = result.rows_affected(), "Demoted primary contact");
        }
        Ok(())
    }

    async fn require_supplier(tx: &mut sqlx::Transaction<'_, Postgres>, id: SupplierId) -> StorageResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM suppliers WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut **tx)
            .await?;
        exists
            .map(|_| ())
            .ok_or_else(|| StorageError::missing_pk("supplier", id))
    }

    async fn get_or_create_named(&self, table: &'static str, name: &str) -> StorageResult<(i64, bool)> {
        let mut tx = self.pool.begin().await?;
        let select = format!("SELECT id FROM {table} WHERE name = $1 ORDER BY id LIMIT 1");
        let existing: Option<i64> = sqlx::query_scalar(&select)
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;
        let result = match existing {
            Some(id) => (id, false),
            None => {
                let insert = format!("INSERT INTO {table} (name) VALUES ($1) RETURNING id");
                let id: i64 = sqlx::query_scalar(&insert)
                    .bind(name)
                    .fetch_one(&mut *tx)
                    .await?;
                (id, true)
            }
        };
        tx.commit().await?;
        Ok(result)
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_vendors(&self, query: &ListQuery) -> StorageResult<Page<VendorDetail>> {
        let pattern = search_pattern(query);
        let (limit, offset) = window(query);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM vendors v WHERE {VENDOR_FILTER}"))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;
        let rows: Vec<VendorRow> = sqlx::query_as(&format!(
            "SELECT v.id, v.name FROM vendors v WHERE {VENDOR_FILTER} ORDER BY v.id LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(self.vendor_details(rows).await?, count(total)))
    }

    async fn get_vendor(&self, id: VendorId) -> StorageResult<VendorDetail> {
        let row: VendorRow = sqlx::query_as("SELECT id, name FROM vendors WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("Vendor", id))?;
        self.vendor_details(vec![row])
            .await?
            .pop()
            .ok_or_else(|| StorageError::not_found("Vendor", id))
    }

    async fn create_vendor(&self, draft: VendorDraft) -> StorageResult<VendorDetail> {
        let mut tx = self.pool.begin().await?;
        Self::check_links(&mut tx, Some(draft.supplier_ids.as_slice()), Some(draft.category_ids.as_slice())).await?;

        let id: i64 = sqlx::query_scalar("INSERT INTO vendors (name) VALUES ($1) RETURNING id")
            .bind(draft.name.trim())
            .fetch_one(&mut *tx)
            .await?;
        Self::replace_links(&mut tx, id, Some(draft.supplier_ids.as_slice()), Some(draft.category_ids.as_slice())).await?;
        tx.commit().await?;

        self.get_vendor(VendorId::new(id)).await
    }

    async fn update_vendor(&self, id: VendorId, patch: VendorPatch) -> StorageResult<VendorDetail> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM vendors WHERE id = $1 FOR UPDATE")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StorageError::not_found("Vendor", id));
        }
        Self::check_links(&mut tx, patch.supplier_ids.as_deref(), patch.category_ids.as_deref()).await?;

        if let Some(name) = &patch.name {
            sqlx::query("UPDATE vendors SET name = $1 WHERE id = $2")
                .bind(name.trim())
                .bind(id.get())
                .execute(&mut *tx)
                .await?;
        }
        Self::replace_links(&mut tx, id.get(), patch.supplier_ids.as_deref(), patch.category_ids.as_deref())
            .await?;
        tx.commit().await?;

        self.get_vendor(id).await
    }

    async fn delete_vendor(&self, id: VendorId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM vendors WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Vendor", id));
        }
        Ok(())
    }

    async fn get_or_create_vendor(&self, name: &str) -> StorageResult<(Vendor, bool)> {
        let (id, created) = self.get_or_create_named("vendors", name).await?;
        Ok((
            Vendor {
                id: VendorId::new(id),
                name: name.to_string(),
            },
            created,
        ))
    }

    async fn add_vendor_supplier(&self, vendor: VendorId, supplier: SupplierId) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM vendors WHERE id = $1")
            .bind(vendor.get())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StorageError::not_found("Vendor", vendor));
        }
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM suppliers WHERE id = $1")
            .bind(supplier.get())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StorageError::not_found("Supplier", supplier));
        }
        sqlx::query("INSERT INTO vendor_suppliers (vendor_id, supplier_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(vendor.get())
            .bind(supplier.get())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_vendor_supplier(&self, vendor: VendorId, supplier: SupplierId) -> StorageResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM vendors WHERE id = $1")
            .bind(vendor.get())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StorageError::not_found("Vendor", vendor));
        }
        sqlx::query("DELETE FROM vendor_suppliers WHERE vendor_id = $1 AND supplier_id = $2")
            .bind(vendor.get())
            .bind(supplier.get())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_vendor_category(&self, vendor: VendorId, category: CategoryId) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM vendors WHERE id = $1")
            .bind(vendor.get())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StorageError::not_found("Vendor", vendor));
        }
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = $1")
            .bind(category.get())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StorageError::not_found("Category", category));
        }
        sqlx::query("INSERT INTO vendor_categories (vendor_id, category_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(vendor.get())
            .bind(category.get())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_vendor_category(&self, vendor: VendorId, category: CategoryId) -> StorageResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM vendors WHERE id = $1")
            .bind(vendor.get())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StorageError::not_found("Vendor", vendor));
        }
        sqlx::query("DELETE FROM vendor_categories WHERE vendor_id = $1 AND category_id = $2")
            .bind(vendor.get())
            .bind(category.get())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_suppliers(&self, query: &ListQuery) -> StorageResult<Page<SupplierDetail>> {
        let pattern = search_pattern(query);
        let (limit, offset) = window(query);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM suppliers s WHERE {SUPPLIER_FILTER}"))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;
        let rows: Vec<SupplierRow> = sqlx::query_as(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers s WHERE {SUPPLIER_FILTER} ORDER BY s.id LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(self.supplier_details(rows).await?, count(total)))
    }

    async fn get_supplier(&self, id: SupplierId) -> StorageResult<SupplierDetail> {
        let row: SupplierRow = sqlx::query_as(&format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers s WHERE s.id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("Supplier", id))?;
        self.supplier_details(vec![row])
            .await?
            .pop()
            .ok_or_else(|| StorageError::not_found("Supplier", id))
    }

    async fn find_supplier_by_name(&self, name: &str) -> StorageResult<Option<Supplier>> {
        let row: Option<SupplierRow> = sqlx::query_as(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers s WHERE s.name = $1 ORDER BY s.id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Supplier::from))
    }

    async fn create_supplier(&self, draft: SupplierDraft) -> StorageResult<SupplierDetail> {
        let mut tx = self.pool.begin().await?;
        let supplier = Self::insert_supplier(&mut tx, draft).await?;
        tx.commit().await?;
        Ok(SupplierDetail {
            supplier,
            contacts: Vec::new(),
        })
    }

    async fn update_supplier(&self, id: SupplierId, patch: SupplierPatch) -> StorageResult<SupplierDetail> {
        let mut tx = self.pool.begin().await?;
        let mut supplier = Self::lock_supplier(&mut tx, "s.id = $1", id.get())
            .await?
            .ok_or_else(|| StorageError::not_found("Supplier", id))?;
        patch.apply(&mut supplier);
        Self::save_supplier(&mut tx, &supplier).await?;
        tx.commit().await?;
        self.get_supplier(id).await
    }

    async fn delete_supplier(&self, id: SupplierId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Supplier", id));
        }
        Ok(())
    }

    async fn get_or_create_supplier(&self, name: &str) -> StorageResult<(Supplier, bool)> {
        let mut tx = self.pool.begin().await?;
        let result = match Self::lock_supplier(&mut tx, "s.name = $1", name.to_string()).await? {
            Some(existing) => (existing, false),
            None => (Self::insert_supplier(&mut tx, SupplierDraft::named(name)).await?, true),
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn upsert_supplier(&self, name: &str, patch: SupplierPatch) -> StorageResult<(Supplier, bool)> {
        let mut tx = self.pool.begin().await?;
        let (mut supplier, created) = match Self::lock_supplier(&mut tx, "s.name = $1", name.to_string()).await? {
            Some(existing) => (existing, false),
            None => (Self::insert_supplier(&mut tx, SupplierDraft::named(name)).await?, true),
        };
        patch.apply(&mut supplier);
        Self::save_supplier(&mut tx, &supplier).await?;
        tx.commit().await?;
        Ok((supplier, created))
    }

    async fn list_categories(&self, query: &ListQuery) -> StorageResult<Page<Category>> {
        let pattern = search_pattern(query);
        let (limit, offset) = window(query);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE ($1::text IS NULL OR name ILIKE $1)")
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, name FROM categories WHERE ($1::text IS NULL OR name ILIKE $1) \
             ORDER BY id LIMIT $2 OFFSET $3",
        )
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(rows.into_iter().map(Category::from).collect(), count(total)))
    }

    async fn get_category(&self, id: CategoryId) -> StorageResult<Category> {
        let row: Option<CategoryRow> = sqlx::query_as("SELECT id, name FROM categories WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Category::from)
            .ok_or_else(|| StorageError::not_found("Category", id))
    }

    async fn create_category(&self, draft: CategoryDraft) -> StorageResult<Category> {
        let row: CategoryRow = sqlx::query_as("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
            .bind(draft.name.trim())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> StorageResult<Category> {
        let row: Option<CategoryRow> =
            sqlx::query_as("UPDATE categories SET name = $1 WHERE id = $2 RETURNING id, name")
                .bind(draft.name.trim())
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Category::from)
            .ok_or_else(|| StorageError::not_found("Category", id))
    }

    async fn delete_category(&self, id: CategoryId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Category", id));
        }
        Ok(())
    }

    async fn get_or_create_category(&self, name: &str) -> StorageResult<(Category, bool)> {
        let (id, created) = self.get_or_create_named("categories", name).await?;
        Ok((
            Category {
                id: CategoryId::new(id),
                name: name.to_string(),
            },
            created,
        ))
    }

    async fn list_contacts(&self, filter: ContactQuery, query: &ListQuery) -> StorageResult<Page<Contact>> {
        let pattern = search_pattern(query);
        let (limit, offset) = window(query);
        let supplier = filter.supplier.map(SupplierId::get);
        let predicate = "($1::bigint IS NULL OR supplier_id = $1) \
                         AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM contacts WHERE {predicate}"))
            .bind(supplier)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;
        let rows: Vec<ContactRow> = sqlx::query_as(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE {predicate} ORDER BY id LIMIT $3 OFFSET $4"
        ))
        .bind(supplier)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(rows.into_iter().map(Contact::from).collect(), count(total)))
    }

    async fn get_contact(&self, id: ContactId) -> StorageResult<Contact> {
        let row: Option<ContactRow> = sqlx::query_as(&format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Contact::from)
            .ok_or_else(|| StorageError::not_found("Contact", id))
    }

    async fn create_contact(&self, draft: ContactDraft) -> StorageResult<Contact> {
        let mut tx = self.pool.begin().await?;
        Self::require_supplier(&mut tx, draft.supplier_id).await?;
        if draft.primary_contact {
            Self::demote_primaries(&mut tx, draft.supplier_id, None).await?;
        }

        let row: ContactRow = sqlx::query_as(&format!(
            "INSERT INTO contacts (supplier_id, name, email, phone, title, notes, primary_contact) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(draft.supplier_id.get())
        .bind(draft.name.trim())
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.title)
        .bind(&draft.notes)
        .bind(draft.primary_contact)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn update_contact(&self, id: ContactId, patch: ContactPatch) -> StorageResult<Contact> {
        let mut tx = self.pool.begin().await?;
        let row: ContactRow = sqlx::query_as(&format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1 FOR UPDATE"))
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StorageError::not_found("Contact", id))?;

        let mut contact = Contact::from(row);
        patch.apply(&mut contact);
        if patch.supplier_id.is_some() {
            Self::require_supplier(&mut tx, contact.supplier_id).await?;
        }
        if contact.primary_contact {
            Self::demote_primaries(&mut tx, contact.supplier_id, Some(id)).await?;
        }

        let row: ContactRow = sqlx::query_as(&format!(
            "UPDATE contacts SET supplier_id = $1, name = $2, email = $3, phone = $4, title = $5, \
             notes = $6, primary_contact = $7 WHERE id = $8 RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(contact.supplier_id.get())
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(&contact.title)
        .bind(&contact.notes)
        .bind(contact.primary_contact)
        .bind(id.get())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn delete_contact(&self, id: ContactId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Contact", id));
        }
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (username, password_hash, is_staff) VALUES ($1, $2, $3) \
             RETURNING id, username, password_hash, is_staff, is_active, date_joined",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match StorageError::from(e) {
            StorageError::Conflict(_) => StorageError::Conflict(format!(
                "A user with username '{}' already exists",
                user.username
            )),
            other => other,
        })?;
        Ok(row.into())
    }

    async fn find_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, is_staff, is_active, date_joined FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn get_user(&self, id: UserId) -> StorageResult<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, is_staff, is_active, date_joined FROM users WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::from)
            .ok_or_else(|| StorageError::not_found("User", id))
    }
}
