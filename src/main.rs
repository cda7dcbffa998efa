use iced::keyboard::{self, Modifiers};
use iced::widget::{button, column, container, row, text, vertical_rule};
use iced::{event, Alignment, Element, Event, Length, Subscription, Task, Theme};
use rfd::FileDialog;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod error;
mod imagery;
mod service;
mod state;
mod ui;

use config::Config;
use imagery::fetch::{candidate_thumbnail_async, candidate_thumbnail_key, fetch_async};
use imagery::locator::{candidate_path, source_location};
use imagery::{ImageSource, SizeHint};
use service::catalog::{
    import_catalog_async, import_catalog_csv_async, list_products_async, load_product_async, ImportResult,
};
use service::generation::{generate_async, GenerationClient};
use state::data::{ImageRef, ProductRecord, ProductSummary};
use state::generation::GenerationTracker;
use state::library::Library;
use state::selection::SelectionState;
use ui::compare::{Viewer, ViewerMessage};
use ui::images::ImageCache;
use ui::product::{product_detail, product_list, DetailContext};

/// Everything resolved before the window opens
struct Boot {
    config: Config,
    db_path: PathBuf,
    thumbnail_dir: Option<PathBuf>,
    generation: GenerationClient,
    product_count: i64,
}

/// Main application state
struct Workbench {
    config: Config,
    db_path: PathBuf,
    /// Disk cache for generated-image thumbnails (None if no cache dir)
    thumbnail_dir: Option<PathBuf>,
    generation: GenerationClient,
    products: Vec<ProductSummary>,
    /// Last product the user asked for; loads for any other id are stale
    requested_product: Option<String>,
    product: Option<ProductRecord>,
    selection: SelectionState,
    tracker: GenerationTracker,
    /// Modifier keys currently held, read at click time
    modifiers: Modifiers,
    viewer: Viewer,
    images: ImageCache,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// User clicked "Import Catalog"
    ImportCatalog,
    /// Background import finished
    ImportComplete(Result<ImportResult, String>),
    ProductsLoaded(Result<Vec<ProductSummary>, String>),
    SelectProduct(String),
    /// Requested id with the load result
    ProductLoaded(String, Result<ProductRecord, String>),
    ImageLoaded((ImageSource, Result<Vec<u8>, String>)),
    ModifiersChanged(Modifiers),
    SourceClicked(ImageRef),
    CandidateClicked(usize),
    Generate,
    /// Product id on success
    GenerationFinished(Result<String, String>),
    OpenComparison,
    Viewer(ViewerMessage),
}

impl Workbench {
    /// Create a new instance of the application
    fn new(boot: Boot) -> (Self, Task<Message>) {
        let Boot {
            config,
            db_path,
            thumbnail_dir,
            generation,
            product_count,
        } = boot;

        let status = format!("Ready. {} products in catalog.", product_count);

        let app = Workbench {
            config,
            db_path,
            thumbnail_dir,
            generation,
            products: Vec::new(),
            requested_product: None,
            product: None,
            selection: SelectionState::new(),
            tracker: GenerationTracker::new(),
            modifiers: Modifiers::default(),
            viewer: Viewer::new(),
            images: ImageCache::new(),
            status,
        };
        let mut tasks = vec![app.reload_products()];
        if let Some(csv_path) = app.config.data.csv_path.clone() {
            info!(path = %csv_path.display(), "importing configured catalog CSV");
            tasks.push(Task::perform(
                import_catalog_csv_async(csv_path, app.db_path.clone()),
                Message::ImportComplete,
            ));
        }
        (app, Task::batch(tasks))
    }

    fn output_root(&self) -> PathBuf {
        self.config.output.base_path.clone()
    }

    fn reload_products(&self) -> Task<Message> {
        Task::perform(
            list_products_async(self.db_path.clone(), self.output_root()),
            Message::ProductsLoaded,
        )
    }

    fn load_product(&self, product_id: String) -> Task<Message> {
        let requested = product_id.clone();
        Task::perform(
            load_product_async(self.db_path.clone(), self.output_root(), product_id),
            move |result| Message::ProductLoaded(requested.clone(), result),
        )
    }

    fn is_requested(&self, product_id: &str) -> bool {
        self.requested_product.as_deref() == Some(product_id)
    }

    /// Start fetches for images not yet in the cache
    fn fetch_images(&mut self, wanted: Vec<ImageSource>) -> Task<Message> {
        let tasks: Vec<Task<Message>> = wanted
            .into_iter()
            .filter(|source| self.images.request(source))
            .map(|source| Task::perform(fetch_async(source), Message::ImageLoaded))
            .collect();
        Task::batch(tasks)
    }

    /// Cache keys of the current product's ghost thumbnails
    fn source_thumbnails(&self) -> Vec<ImageSource> {
        let Some(product) = &self.product else {
            return Vec::new();
        };
        let size = self.config.images.thumbnail_size;
        product
            .source_images
            .iter()
            .map(|source| source_location(source, SizeHint::Thumbnail(size)))
            .collect()
    }

    /// Cache keys of the current product's generated images, with their files
    fn candidate_thumbnails(&self) -> Vec<(ImageSource, PathBuf)> {
        let Some(product) = &self.product else {
            return Vec::new();
        };
        let size = self.config.images.thumbnail_size;
        let output_root = self.output_root();
        product
            .candidate_images
            .iter()
            .map(|candidate| {
                let path = candidate_path(&candidate.image, &output_root);
                (candidate_thumbnail_key(&path, self.thumbnail_dir.as_deref(), size), path)
            })
            .collect()
    }

    /// Images the current product view or the open comparison can show
    fn referenced_images(&self) -> HashSet<ImageSource> {
        let mut keys: HashSet<ImageSource> = self.source_thumbnails().into_iter().collect();
        keys.extend(self.candidate_thumbnails().into_iter().map(|(key, _)| key));
        keys.extend(
            self.viewer
                .wanted_images(&self.config.output.base_path, self.config.images.full_size),
        );
        keys
    }

    fn prune_images(&mut self) {
        let keep = self.referenced_images();
        self.images.retain_only(&keep);
        debug!(cached = self.images.len(), "image cache pruned");
    }

    /// Thumbnails for the product's ghost images and generated images
    fn fetch_product_images(&mut self) -> Task<Message> {
        let size = self.config.images.thumbnail_size;
        let mut tasks = vec![self.fetch_images(self.source_thumbnails())];
        for (key, path) in self.candidate_thumbnails() {
            if self.images.request(&key) {
                tasks.push(Task::perform(
                    candidate_thumbnail_async(path, self.thumbnail_dir.clone(), size),
                    Message::ImageLoaded,
                ));
            }
        }
        Task::batch(tasks)
    }

    /// Full-size images for the open comparison
    fn fetch_viewer_images(&mut self) -> Task<Message> {
        let wanted = self
            .viewer
            .wanted_images(&self.config.output.base_path, self.config.images.full_size);
        self.fetch_images(wanted)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ImportCatalog => {
                // Show the native folder picker dialog
                let folder = FileDialog::new()
                    .set_title("Select Folder with Catalog Exports")
                    .pick_folder();

                if let Some(folder_path) = folder {
                    self.status = format!("Importing from {}...", folder_path.display());
                    return Task::perform(
                        import_catalog_async(folder_path, self.db_path.clone()),
                        Message::ImportComplete,
                    );
                }

                Task::none()
            }
            Message::ImportComplete(Ok(result)) => {
                self.status = format!(
                    "✅ Import complete! Added {} products, updated {}, {} failed.",
                    result.imported_count, result.updated_count, result.failed_count
                );
                self.reload_products()
            }
            Message::ImportComplete(Err(e)) => {
                error!(error = %e, "catalog import failed");
                self.status = format!("❌ Import failed: {e}");
                Task::none()
            }
            Message::ProductsLoaded(Ok(products)) => {
                info!(count = products.len(), "product list loaded");
                self.products = products;
                Task::none()
            }
            Message::ProductsLoaded(Err(e)) => {
                error!(error = %e, "product list failed to load");
                self.status = format!("❌ Could not load products: {e}");
                Task::none()
            }
            Message::SelectProduct(product_id) => {
                self.status = format!("Loading {product_id}...");
                self.requested_product = Some(product_id.clone());
                self.load_product(product_id)
            }
            Message::ProductLoaded(requested, _) if !self.is_requested(&requested) => {
                debug!(product = %requested, "dropping stale product load");
                Task::none()
            }
            Message::ProductLoaded(_, Ok(product)) => {
                self.selection
                    .load_product(&product.id, &product.source_images, product.candidate_images.len());
                self.status = format!(
                    "{}: {} ghost images, {} generated.",
                    product.name,
                    product.source_images.len(),
                    product.candidate_images.len()
                );
                // Files missing earlier may exist after a generation run
                self.images.forget_failures();
                self.product = Some(product);
                self.prune_images();
                self.fetch_product_images()
            }
            Message::ProductLoaded(_, Err(e)) => {
                error!(error = %e, "product failed to load");
                self.status = format!("❌ Could not load product: {e}");
                Task::none()
            }
            Message::ImageLoaded((source, result)) => {
                self.images.insert(source, result);
                Task::none()
            }
            Message::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers;
                Task::none()
            }
            Message::SourceClicked(image) => {
                self.selection.pick(&image, self.modifiers.into());
                Task::none()
            }
            Message::CandidateClicked(index) => {
                if let Err(e) = self.selection.set_active_candidate(index) {
                    error!(error = %e, "candidate click outside the list");
                }
                Task::none()
            }
            Message::Generate => {
                let Some(product) = &self.product else {
                    return Task::none();
                };
                match self
                    .tracker
                    .submit(&product.id, self.selection.selected(), &self.config.generation.engine)
                {
                    Ok(request) => {
                        self.status = format!(
                            "🎨 Generating for {} from {} source image(s)...",
                            product.name,
                            request.selected_source_images.len()
                        );
                        Task::perform(
                            generate_async(self.generation.clone(), request),
                            Message::GenerationFinished,
                        )
                    }
                    Err(e) => {
                        warn!(error = %e, "generation not submitted");
                        self.status = e.to_string();
                        Task::none()
                    }
                }
            }
            Message::GenerationFinished(result) => {
                self.tracker.finish();
                match result {
                    Ok(product_id) => {
                        self.status = "✅ Generation complete.".to_string();
                        let still_viewing = self.is_requested(&product_id);
                        let mut tasks = vec![self.reload_products()];
                        if still_viewing {
                            tasks.push(self.load_product(product_id));
                        }
                        Task::batch(tasks)
                    }
                    Err(e) => {
                        error!(error = %e, "generation failed");
                        self.status = format!("❌ Generation failed: {e}");
                        Task::none()
                    }
                }
            }
            Message::OpenComparison => {
                let Some(product) = &self.product else {
                    return Task::none();
                };
                let source_index = self.selection.primary_source_index().unwrap_or(0);
                let opened = self.viewer.open(
                    product.source_images.clone(),
                    source_index,
                    product.candidate_images.clone(),
                    self.selection.active_candidate(),
                );
                match opened {
                    Ok(()) => self.fetch_viewer_images(),
                    Err(e) => {
                        error!(error = %e, "comparison not opened");
                        self.status = format!("❌ {e}");
                        Task::none()
                    }
                }
            }
            Message::Viewer(message) => {
                let was_open = self.viewer.is_open();
                self.viewer.update(message);
                if was_open && !self.viewer.is_open() {
                    self.prune_images();
                }
                self.fetch_viewer_images()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        if self.viewer.is_open() {
            return self
                .viewer
                .view(&self.images, &self.config.output.base_path, self.config.images.full_size)
                .map(Message::Viewer);
        }

        let sidebar = column![
            text("Ghost Workbench").size(28),
            button("Import Catalog")
                .on_press(Message::ImportCatalog)
                .padding(10),
            product_list(&self.products, self.product.as_ref().map(|p| p.id.as_str())),
        ]
        .spacing(16)
        .padding(16)
        .width(Length::Fixed(320.0));

        let detail: Element<Message> = match &self.product {
            Some(product) => product_detail(
                product,
                DetailContext {
                    selection: &self.selection,
                    images: &self.images,
                    output_root: &self.config.output.base_path,
                    thumbnail_dir: self.thumbnail_dir.as_deref(),
                    thumbnail_size: self.config.images.thumbnail_size,
                    can_generate: self.tracker.can_submit(self.selection.selected()),
                    generating: self.tracker.is_in_flight(),
                },
            ),
            None => container(text("Select a product").size(18))
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into(),
        };

        let content = column![
            row![sidebar, vertical_rule(1), detail].height(Length::Fill),
            text(&self.status).size(14),
        ]
        .spacing(8)
        .padding(8)
        .align_x(Alignment::Start);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        let modifiers = event::listen_with(|event, _status, _window| match event {
            Event::Keyboard(keyboard::Event::ModifiersChanged(modifiers)) => {
                Some(Message::ModifiersChanged(modifiers))
            }
            _ => None,
        });
        Subscription::batch([modifiers, self.viewer.subscription().map(Message::Viewer)])
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ghost_workbench=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolve config, catalog and cache before the window opens
fn boot() -> error::Result<Boot> {
    let config = Config::load()?;
    let library = Library::new(config.catalog.db_path.clone())?;
    state::library::log_summary(&library)?;
    let product_count = library.product_count()?;

    let generation = GenerationClient::new(&config.generation)?;

    let thumbnail_dir = match imagery::thumbnail::thumbnail_cache_dir() {
        Ok(dir) => Some(dir),
        Err(e) => {
            warn!(error = %e, "thumbnail cache disabled");
            None
        }
    };

    Ok(Boot {
        db_path: library.path().clone(),
        config,
        thumbnail_dir,
        generation,
        product_count,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let boot = boot().inspect_err(|e| error!(error = %e, "startup failed"))?;
    info!(output = %boot.config.output.base_path.display(), "🎯 Ghost Workbench starting");

    iced::application("Ghost Workbench", Workbench::update, Workbench::view)
        .subscription(Workbench::subscription)
        .theme(Workbench::theme)
        .centered()
        .run_with(move || Workbench::new(boot))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbench(dir: &std::path::Path) -> Workbench {
        let mut config = Config::default();
        config.output.base_path = dir.join("output");
        let boot = Boot {
            db_path: dir.join("catalog.db"),
            thumbnail_dir: None,
            generation: GenerationClient::new(&config.generation).unwrap(),
            product_count: 0,
            config,
        };
        Workbench::new(boot).0
    }

    fn record(id: &str) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            name: format!("Product {id}"),
            brand: String::new(),
            class_description: String::new(),
            tranche: "T1".to_string(),
            specifications: Default::default(),
            source_images: vec![ImageRef::new(format!("https://cdn.example.com/{id}"))],
            candidate_images: Vec::new(),
        }
    }

    fn thumbnail_key(app: &Workbench, id: &str) -> ImageSource {
        source_location(
            &ImageRef::new(format!("https://cdn.example.com/{id}")),
            SizeHint::Thumbnail(app.config.images.thumbnail_size),
        )
    }

    #[test]
    fn test_late_load_of_previous_product_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = workbench(dir.path());

        let _ = app.update(Message::SelectProduct("p1".to_string()));
        let _ = app.update(Message::SelectProduct("p2".to_string()));
        let _ = app.update(Message::ProductLoaded("p2".to_string(), Ok(record("p2"))));
        let _ = app.update(Message::ProductLoaded("p1".to_string(), Ok(record("p1"))));

        assert_eq!(app.product.as_ref().map(|p| p.id.as_str()), Some("p2"));
        assert_eq!(app.selection.product_id(), Some("p2"));

        let _ = app.update(Message::ProductLoaded("p1".to_string(), Err("gone".to_string())));
        assert!(!app.status.contains("gone"));
    }

    #[test]
    fn test_switching_products_prunes_image_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = workbench(dir.path());

        let _ = app.update(Message::SelectProduct("p1".to_string()));
        let _ = app.update(Message::ProductLoaded("p1".to_string(), Ok(record("p1"))));
        let first = thumbnail_key(&app, "p1");
        assert!(app.referenced_images().contains(&first));
        assert_eq!(app.images.len(), 1);

        let _ = app.update(Message::SelectProduct("p2".to_string()));
        let _ = app.update(Message::ProductLoaded("p2".to_string(), Ok(record("p2"))));
        assert_eq!(app.images.len(), 1);
        assert!(!app.referenced_images().contains(&first));

        // The first product's fetch finishing late must not repopulate the cache
        let _ = app.update(Message::ImageLoaded((first, Err("slow".to_string()))));
        assert_eq!(app.images.len(), 1);
    }
}
