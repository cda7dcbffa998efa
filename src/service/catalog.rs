/// Catalog access: product list, product records and folder imports
///
/// Each background task opens its own database connection because
/// `rusqlite::Connection` is not `Send`.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, WorkbenchError};
use crate::state::data::{ProductRecord, ProductSummary};
use crate::state::library::{parse_catalog_csv, parse_export, Library, ProductExport, UpsertOutcome};
use crate::state::outputs::OutputIndex;

/// Source of product records
pub trait CatalogService {
    /// Summaries of all products; products with generated images first, then by name
    fn list_products(&self) -> Result<Vec<ProductSummary>>;

    /// Full record with ghost images and generated candidates
    fn product(&self, id: &str) -> Result<ProductRecord>;
}

/// Catalog backed by the SQLite library and the generator's output folder
#[derive(Debug)]
pub struct LocalCatalog {
    library: Library,
    outputs: OutputIndex,
}

impl LocalCatalog {
    pub fn new(library: Library, outputs: OutputIndex) -> Self {
        Self { library, outputs }
    }

    pub fn open(db_path: &Path, output_root: &Path) -> Result<Self> {
        Ok(Self::new(Library::open(db_path)?, OutputIndex::new(output_root)))
    }
}

impl CatalogService for LocalCatalog {
    fn list_products(&self) -> Result<Vec<ProductSummary>> {
        let generated = self.outputs.products_with_generations();
        let mut products: Vec<ProductSummary> = self
            .library
            .products()?
            .into_iter()
            .map(|product| ProductSummary {
                has_generated_images: generated.contains(&product.id),
                id: product.id,
                name: product.name,
                class_description: product.class_description,
                tranche: product.tranche,
            })
            .collect();

        products.sort_by(|a, b| {
            b.has_generated_images
                .cmp(&a.has_generated_images)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(products)
    }

    /// `id` may be a cupidName or a SKU
    fn product(&self, id: &str) -> Result<ProductRecord> {
        let product = match self.library.product(id)? {
            Some(product) => product,
            None => self
                .library
                .product_by_sku(id)?
                .ok_or_else(|| WorkbenchError::ProductNotFound(id.to_string()))?,
        };
        let source_images = self.library.source_images(&product.id)?;
        let candidate_images = self.outputs.candidates_for(&product.id);

        debug!(
            product = %product.id,
            sources = source_images.len(),
            candidates = candidate_images.len(),
            "product loaded"
        );

        Ok(ProductRecord {
            id: product.id,
            name: product.name,
            brand: product.brand,
            class_description: product.class_description,
            tranche: product.tranche,
            specifications: product.specifications,
            source_images,
            candidate_images,
        })
    }
}

/// Async product list for `Task::perform`
pub async fn list_products_async(db_path: PathBuf, output_root: PathBuf) -> std::result::Result<Vec<ProductSummary>, String> {
    LocalCatalog::open(&db_path, &output_root)
        .and_then(|catalog| catalog.list_products())
        .map_err(|e| e.to_string())
}

/// Async product load for `Task::perform`
pub async fn load_product_async(
    db_path: PathBuf,
    output_root: PathBuf,
    product_id: String,
) -> std::result::Result<ProductRecord, String> {
    LocalCatalog::open(&db_path, &output_root)
        .and_then(|catalog| catalog.product(&product_id))
        .map_err(|e| e.to_string())
}

/// Result of a catalog import operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub imported_count: usize,
    pub updated_count: usize,
    pub failed_count: usize,
}

/// Import every `*.json` export and `*.csv` catalog found under `folder_path`
pub fn import_catalog(folder_path: &Path, library: &mut Library) -> ImportResult {
    let mut result = ImportResult::default();
    let imported_at = Utc::now().timestamp();

    info!(folder = %folder_path.display(), "🔍 scanning for catalog exports");

    for entry in WalkDir::new(folder_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let products = match extension.as_str() {
            "json" => read_export(path),
            "csv" => read_catalog_csv(path).map(|(products, rejected)| {
                result.failed_count += rejected;
                products
            }),
            _ => continue,
        };
        match products {
            Ok(products) => upsert_all(library, &products, imported_at, &mut result),
            Err(e) => {
                warn!(error = %e, "⚠️  skipping catalog file");
                result.failed_count += 1;
            }
        }
    }

    log_import(&result);
    result
}

/// Import a single catalog CSV, as configured by `data.csv_path`
pub fn import_catalog_csv(csv_path: &Path, library: &mut Library) -> Result<ImportResult> {
    info!(path = %csv_path.display(), "📄 importing catalog CSV");
    let (products, rejected) = read_catalog_csv(csv_path)?;

    let mut result = ImportResult {
        failed_count: rejected,
        ..ImportResult::default()
    };
    upsert_all(library, &products, Utc::now().timestamp(), &mut result);

    log_import(&result);
    Ok(result)
}

fn read_export(path: &Path) -> Result<Vec<ProductExport>> {
    let contents = std::fs::read_to_string(path).map_err(|e| WorkbenchError::io(path, e))?;
    parse_export(&contents).map_err(|e| WorkbenchError::json(path, e))
}

fn read_catalog_csv(path: &Path) -> Result<(Vec<ProductExport>, usize)> {
    let file = std::fs::File::open(path).map_err(|e| WorkbenchError::io(path, e))?;
    let catalog = parse_catalog_csv(file).map_err(|e| WorkbenchError::csv(path, e))?;
    if catalog.rejected > 0 {
        warn!(path = %path.display(), rows = catalog.rejected, "⚠️  catalog rows skipped");
    }
    Ok((catalog.products, catalog.rejected))
}

fn upsert_all(library: &mut Library, products: &[ProductExport], imported_at: i64, result: &mut ImportResult) {
    for product in products {
        match library.upsert_product(product, imported_at) {
            Ok(UpsertOutcome::Inserted) => result.imported_count += 1,
            Ok(UpsertOutcome::Updated) => result.updated_count += 1,
            Err(e) => {
                warn!(product = %product.id, error = %e, "⚠️  error importing product");
                result.failed_count += 1;
            }
        }
    }
}

fn log_import(result: &ImportResult) {
    info!(
        imported = result.imported_count,
        updated = result.updated_count,
        failed = result.failed_count,
        "✅ catalog import complete"
    );
}

/// Async wrapper around [`import_catalog`] with its own connection
pub async fn import_catalog_async(folder_path: PathBuf, db_path: PathBuf) -> std::result::Result<ImportResult, String> {
    let mut library = Library::open(&db_path).map_err(|e| e.to_string())?;
    Ok(import_catalog(&folder_path, &mut library))
}

/// Async wrapper around [`import_catalog_csv`] with its own connection
pub async fn import_catalog_csv_async(csv_path: PathBuf, db_path: PathBuf) -> std::result::Result<ImportResult, String> {
    let mut library = Library::open(&db_path).map_err(|e| e.to_string())?;
    import_catalog_csv(&csv_path, &mut library).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn seeded_catalog(output_root: &Path) -> LocalCatalog {
        let mut library = Library::open_in_memory().unwrap();
        let products = parse_export(
            r#"[
                { "id": "p1", "name": "Zephyr Jacket", "assetDetails": [
                    { "assetSequence": 1, "imageAddress": "https://cdn.example.com/p1-front" },
                    { "assetSequence": 2, "imageAddress": "https://cdn.example.com/p1-back" } ] },
                { "id": "p2", "name": "Alpine Boot" },
                { "id": "p3", "name": "Basecamp Tent" }
            ]"#,
        )
        .unwrap();
        for product in &products {
            library.upsert_product(product, 0).unwrap();
        }
        LocalCatalog::new(library, OutputIndex::new(output_root))
    }

    fn write_candidate(root: &Path, stem: &str) {
        fs::create_dir_all(root.join("logs/T1")).unwrap();
        fs::create_dir_all(root.join("T1")).unwrap();
        fs::write(
            root.join(format!("logs/T1/{stem}.json")),
            format!(r#"{{"tranche":"T1","image_file":"{stem}.jpg","prompts":{{"positive":"on white"}}}}"#),
        )
        .unwrap();
        fs::write(root.join(format!("T1/{stem}.jpg")), b"jpeg").unwrap();
    }

    #[test]
    fn test_products_with_generations_sort_first() {
        let dir = tempfile::tempdir().unwrap();
        write_candidate(dir.path(), "p3_l101");
        let catalog = seeded_catalog(dir.path());

        let names: Vec<String> = catalog.list_products().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Basecamp Tent", "Alpine Boot", "Zephyr Jacket"]);
    }

    #[test]
    fn test_product_record_combines_sources_and_candidates() {
        let dir = tempfile::tempdir().unwrap();
        write_candidate(dir.path(), "p1_l102");
        write_candidate(dir.path(), "p1_l101");
        let catalog = seeded_catalog(dir.path());

        let record = catalog.product("p1").unwrap();
        assert_eq!(record.source_images.len(), 2);
        assert_eq!(record.source_images[0].locator(), "https://cdn.example.com/p1-front");
        assert_eq!(record.candidate_images.len(), 2);
        assert_eq!(record.candidate_images[0].file_name(), "p1_l101.jpg");

        assert!(matches!(catalog.product("nope"), Err(WorkbenchError::ProductNotFound(_))));
    }

    #[test]
    fn test_import_counts_inserts_updates_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exports/2024");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("exports/a.json"), r#"[{"id":"p1","name":"One"},{"id":"p2","name":"Two"}]"#).unwrap();
        fs::write(nested.join("b.json"), r#"{"id":"p1","name":"One (revised)"}"#).unwrap();
        fs::write(nested.join("broken.json"), "[{").unwrap();
        fs::write(nested.join("notes.txt"), "ignored").unwrap();

        let mut library = Library::open_in_memory().unwrap();
        let result = import_catalog(dir.path(), &mut library);

        assert_eq!(result.imported_count + result.updated_count, 3);
        assert_eq!(result.imported_count, 2);
        assert_eq!(result.failed_count, 1);
        assert_eq!(library.product_count().unwrap(), 2);
    }

    const CSV: &str = "\
cupidName,SKU,SKU Main Description,Brand Description,Class Description,Tranche,Specifications,Enrichment,assetDetails
p7,9001.0,HIKING POLE,Stride,Gear,T1,\"{'Material': 'Carbon'}\",\"{'Product Name': 'Summit Pole'}\",\"[{'assetSequence': 1, 'imageAddress': 'https://cdn.example.com/p7'}]\"
,9002,MISSING ID,,,,,,
";

    #[test]
    fn test_csv_import_and_sku_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("products.csv");
        fs::write(&csv_path, CSV).unwrap();
        write_candidate(dir.path(), "p7_l101");

        let mut library = Library::open_in_memory().unwrap();
        let result = import_catalog_csv(&csv_path, &mut library).unwrap();
        assert_eq!(result, ImportResult { imported_count: 1, updated_count: 0, failed_count: 1 });

        let catalog = LocalCatalog::new(library, OutputIndex::new(dir.path()));
        let record = catalog.product("9001").unwrap();
        assert_eq!(record.id, "p7");
        assert_eq!(record.name, "Summit Pole");
        assert_eq!(record.specifications["Material"], "Carbon");
        assert_eq!(record.source_images[0].locator(), "https://cdn.example.com/p7");
        assert_eq!(record.candidate_images.len(), 1);
    }

    #[test]
    fn test_folder_import_includes_csv() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("products.csv"), CSV).unwrap();
        fs::write(dir.path().join("extra.json"), r#"{"id":"p8","name":"Eight"}"#).unwrap();

        let mut library = Library::open_in_memory().unwrap();
        let result = import_catalog(dir.path(), &mut library);
        assert_eq!(result.imported_count, 2);
        assert_eq!(result.failed_count, 1);
        assert!(library.product_by_sku("9001").unwrap().is_some());
    }

    #[test]
    fn test_missing_csv_is_an_error() {
        let mut library = Library::open_in_memory().unwrap();
        let err = import_catalog_csv(Path::new("/nonexistent/products.csv"), &mut library).unwrap_err();
        assert!(matches!(err, WorkbenchError::Io { .. }));
    }
}
