use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::data::ImageRef;
use crate::error::{Result, WorkbenchError};

/// Sequence given to assets exported without one, so they sort last
const MISSING_SEQUENCE: i64 = 999;

/// One product as found in a catalog export file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductExport {
    #[serde(alias = "cupidName")]
    pub id: String,
    pub name: String,
    #[serde(default, alias = "SKU")]
    pub sku: Option<String>,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub class_description: String,
    #[serde(default)]
    pub tranche: String,
    #[serde(default)]
    pub specifications: BTreeMap<String, Value>,
    #[serde(default)]
    pub asset_details: Vec<AssetDetail>,
}

/// A ghost image entry in a catalog export
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDetail {
    #[serde(default)]
    pub asset_sequence: Option<i64>,
    #[serde(default)]
    pub image_address: Option<String>,
}

impl ProductExport {
    /// Specification values flattened to display strings
    pub fn specification_strings(&self) -> BTreeMap<String, String> {
        self.specifications
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect()
    }

    /// Image addresses ordered by asset sequence, blanks dropped
    pub fn ordered_assets(&self) -> Vec<(i64, String)> {
        let mut assets: Vec<(i64, String)> = self
            .asset_details
            .iter()
            .filter_map(|asset| {
                let address = asset.image_address.as_deref()?.trim();
                if address.is_empty() {
                    return None;
                }
                Some((asset.asset_sequence.unwrap_or(MISSING_SEQUENCE), address.to_string()))
            })
            .collect();
        assets.sort_by_key(|(sequence, _)| *sequence);
        assets
    }
}

/// Product row as stored in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProduct {
    pub id: String,
    pub name: String,
    pub sku: Option<String>,
    pub brand: String,
    pub class_description: String,
    pub tranche: String,
    pub specifications: BTreeMap<String, String>,
}

/// Whether an upsert created or replaced a product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// The Library manages the SQLite product catalog.
/// It stores product metadata and the ordered ghost images of each product.
pub struct Library {
    conn: Connection,
    db_path: PathBuf,
}

impl Library {
    /// Open the catalog at `db_path`, or in the user's data directory:
    /// - Linux: ~/.local/share/ghost-workbench/catalog.db
    /// - macOS: ~/Library/Application Support/ghost-workbench/catalog.db
    /// - Windows: %APPDATA%\ghost-workbench\catalog.db
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => Self::default_db_path()?,
        };

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WorkbenchError::io(parent, e))?;
        }

        Self::open(&db_path)
    }

    /// Open an existing or new database file without touching directories
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        debug!(path = %db_path.display(), "catalog database opened");

        let mut library = Library {
            conn,
            db_path: db_path.to_path_buf(),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Throwaway catalog for tests
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let mut library = Library {
            conn: Connection::open_in_memory()?,
            db_path: PathBuf::from(":memory:"),
        };
        library.init_schema()?;
        Ok(library)
    }

    fn default_db_path() -> Result<PathBuf> {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(WorkbenchError::NoDirectory("data"))?;

        path.push("ghost-workbench");
        path.push("catalog.db");
        Ok(path)
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS products (
                id                  TEXT PRIMARY KEY,
                name                TEXT NOT NULL,
                brand               TEXT NOT NULL DEFAULT '',
                class_description   TEXT NOT NULL DEFAULT '',
                tranche             TEXT NOT NULL DEFAULT '',
                specifications_json TEXT NOT NULL DEFAULT '{}',
                imported_at         INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS source_images (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id  TEXT NOT NULL,
                sequence    INTEGER NOT NULL,
                locator     TEXT NOT NULL,
                FOREIGN KEY(product_id) REFERENCES products(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_products_tranche
             ON products(tranche);

            CREATE INDEX IF NOT EXISTS idx_source_images_product
             ON source_images(product_id, sequence);",
        )?;

        // Catalogs created before CSV import have no sku column; the ALTER
        // fails harmlessly when it already exists
        let _ = self.conn.execute("ALTER TABLE products ADD COLUMN sku TEXT", []);

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_products_sku
             ON products(sku)",
            [],
        )?;

        debug!("catalog schema initialized");
        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    pub fn product_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert or replace a product and its ghost images
    pub fn upsert_product(&mut self, product: &ProductExport, imported_at: i64) -> Result<UpsertOutcome> {
        let specifications = serde_json::to_string(&product.specification_strings())
            .map_err(|e| WorkbenchError::json(&self.db_path, e))?;

        let tx = self.conn.transaction()?;
        let exists: bool = tx
            .query_row("SELECT 1 FROM products WHERE id = ?1", [&product.id], |_| Ok(()))
            .optional()?
            .is_some();

        tx.execute(
            "INSERT INTO products (id, name, brand, class_description, tranche, specifications_json, imported_at, sku)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                sku = excluded.sku,
                brand = excluded.brand,
                class_description = excluded.class_description,
                tranche = excluded.tranche,
                specifications_json = excluded.specifications_json,
                imported_at = excluded.imported_at",
            params![
                product.id,
                product.name,
                product.brand,
                product.class_description,
                product.tranche,
                specifications,
                imported_at,
                product.sku,
            ],
        )?;

        tx.execute("DELETE FROM source_images WHERE product_id = ?1", [&product.id])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO source_images (product_id, sequence, locator) VALUES (?1, ?2, ?3)",
            )?;
            for (sequence, locator) in product.ordered_assets() {
                insert.execute(params![product.id, sequence, locator])?;
            }
        }
        tx.commit()?;

        Ok(if exists {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    /// All products, unsorted
    pub fn products(&self) -> Result<Vec<CatalogProduct>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, brand, class_description, tranche, specifications_json, sku FROM products",
        )?;

        let rows = stmt.query_map([], Self::row_to_product)?;
        let mut products = Vec::new();
        for product in rows {
            products.push(product?);
        }
        Ok(products)
    }

    pub fn product(&self, id: &str) -> Result<Option<CatalogProduct>> {
        let product = self
            .conn
            .query_row(
                "SELECT id, name, brand, class_description, tranche, specifications_json, sku
                 FROM products WHERE id = ?1",
                [id],
                Self::row_to_product,
            )
            .optional()?;
        Ok(product)
    }

    /// First imported product carrying `sku`
    pub fn product_by_sku(&self, sku: &str) -> Result<Option<CatalogProduct>> {
        let product = self
            .conn
            .query_row(
                "SELECT id, name, brand, class_description, tranche, specifications_json, sku
                 FROM products WHERE sku = ?1 ORDER BY rowid LIMIT 1",
                [normalize_sku(sku)],
                Self::row_to_product,
            )
            .optional()?;
        Ok(product)
    }

    /// Ghost images of a product in asset-sequence order
    pub fn source_images(&self, product_id: &str) -> Result<Vec<ImageRef>> {
        let mut stmt = self.conn.prepare(
            "SELECT locator FROM source_images WHERE product_id = ?1 ORDER BY sequence, id",
        )?;
        let rows = stmt.query_map([product_id], |row| row.get::<_, String>(0))?;

        let mut images = Vec::new();
        for locator in rows {
            images.push(ImageRef::new(locator?));
        }
        Ok(images)
    }

    fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogProduct> {
        let specifications_json: String = row.get(5)?;
        // Written by upsert_product, so a parse failure means manual tampering
        let specifications = serde_json::from_str(&specifications_json).unwrap_or_default();
        Ok(CatalogProduct {
            id: row.get(0)?,
            name: row.get(1)?,
            brand: row.get(2)?,
            class_description: row.get(3)?,
            tranche: row.get(4)?,
            specifications,
            sku: row.get(6)?,
        })
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}

/// Parse a catalog export file holding one product or an array of products
pub fn parse_export(contents: &str) -> serde_json::Result<Vec<ProductExport>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ExportFile {
        Many(Vec<ProductExport>),
        One(Box<ProductExport>),
    }

    Ok(match serde_json::from_str(contents)? {
        ExportFile::Many(products) => products,
        ExportFile::One(product) => vec![*product],
    })
}

/// One row of the product catalog CSV
#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "cupidName")]
    cupid_name: Option<String>,
    #[serde(rename = "SKU")]
    sku: Option<String>,
    #[serde(rename = "SKU Main Description")]
    description: Option<String>,
    #[serde(rename = "Brand Description")]
    brand: Option<String>,
    #[serde(rename = "Class Description")]
    class_description: Option<String>,
    #[serde(rename = "Tranche")]
    tranche: Option<String>,
    #[serde(rename = "Specifications")]
    specifications: Option<String>,
    #[serde(rename = "Enrichment")]
    enrichment: Option<String>,
    #[serde(rename = "assetDetails")]
    asset_details: Option<String>,
}

impl CatalogRow {
    /// `None` for rows without a cupidName
    fn into_export(self) -> Option<ProductExport> {
        let id = non_blank(self.cupid_name)?;

        let enrichment = self.enrichment.as_deref().and_then(parse_quoted_json);
        let enriched_name = enrichment
            .as_ref()
            .and_then(|e| e.get("Product Name"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let name = enriched_name
            .or_else(|| non_blank(self.description))
            .unwrap_or_else(|| id.clone());

        let specifications = self
            .specifications
            .as_deref()
            .and_then(parse_quoted_json)
            .and_then(|value| match value {
                Value::Object(map) => Some(map.into_iter().collect()),
                _ => None,
            })
            .unwrap_or_default();

        let asset_details = self
            .asset_details
            .as_deref()
            .and_then(parse_quoted_json)
            .map(|value| csv_assets(&value))
            .unwrap_or_default();

        Some(ProductExport {
            id,
            name,
            sku: non_blank(self.sku).map(|sku| normalize_sku(&sku)),
            brand: non_blank(self.brand).unwrap_or_default(),
            class_description: non_blank(self.class_description).unwrap_or_default(),
            tranche: non_blank(self.tranche).unwrap_or_default(),
            specifications,
            asset_details,
        })
    }
}

/// Products read from a catalog CSV
#[derive(Debug, Default)]
pub struct CatalogCsv {
    pub products: Vec<ProductExport>,
    /// Rows that failed to parse or had no cupidName
    pub rejected: usize,
}

/// Read a catalog CSV; bad rows are skipped, a bad header is an error
pub fn parse_catalog_csv<R: Read>(reader: R) -> csv::Result<CatalogCsv> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    reader.headers()?;

    let mut catalog = CatalogCsv::default();
    for (line, row) in reader.deserialize::<CatalogRow>().enumerate() {
        match row.map(CatalogRow::into_export) {
            Ok(Some(product)) => catalog.products.push(product),
            Ok(None) => {
                debug!(row = line + 1, "catalog row without cupidName");
                catalog.rejected += 1;
            }
            Err(e) => {
                warn!(row = line + 1, error = %e, "⚠️  unreadable catalog row");
                catalog.rejected += 1;
            }
        }
    }
    Ok(catalog)
}

/// Parse a JSON cell that may have been written with single quotes
fn parse_quoted_json(cell: &str) -> Option<Value> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    serde_json::from_str(cell)
        .or_else(|_| serde_json::from_str(&cell.replace('\'', "\"")))
        .ok()
}

/// Asset entries from a CSV cell; sequences may be numbers or numeric strings
fn csv_assets(value: &Value) -> Vec<AssetDetail> {
    let Some(assets) = value.as_array() else {
        return Vec::new();
    };
    assets
        .iter()
        .map(|asset| AssetDetail {
            asset_sequence: match asset.get("assetSequence") {
                Some(Value::Number(n)) => n.as_i64(),
                Some(Value::String(s)) => s.trim().parse().ok(),
                _ => None,
            },
            image_address: asset.get("imageAddress").and_then(Value::as_str).map(str::to_string),
        })
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Spreadsheet exports turn integer SKUs into `"123.0"`
fn normalize_sku(sku: &str) -> String {
    let sku = sku.trim();
    match sku.strip_suffix(".0") {
        Some(int) if !int.is_empty() && int.bytes().all(|b| b.is_ascii_digit()) => int.to_string(),
        _ => sku.to_string(),
    }
}

/// Log a short catalog summary
pub fn log_summary(library: &Library) -> Result<()> {
    info!(products = library.product_count()?, path = %library.path().display(), "📁 catalog ready");
    Ok(())
}
