use crate::api_client::{ApiError, RecordKind, RecordStore, StoreRecord};
use crate::image_source::{ImageQuery, ImageSource};
use crate::promotions::PromotionDraft;
use crate::seed_queue::SeedQueue;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Words that say nothing about what the dish looks like.
const STOP_WORDS: &[&str] = &[
    "pitsa", "pizza", "katta", "kichik", "juda", "large", "small", "big", "little", "taom", "dish",
];
const MAX_KEYWORDS: usize = 3;
const MAX_FALLBACK_TERM_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedingConfig {
    pub kinds: Vec<RecordKind>,
    /// Pause after every processed record.
    pub rate_limit_ms: u64,
    /// Pause after a failed lookup or download.
    pub failure_delay_ms: u64,
    /// Search the stock-photo source for records without an explicit URL.
    pub keyword_search: bool,
    /// Menu item name -> image URL.
    pub menu_item_overrides: BTreeMap<String, String>,
    /// Promotion title -> image URL.
    pub promotion_overrides: BTreeMap<String, String>,
    pub promotion_seed_path: Option<PathBuf>,
}

impl SeedingConfig {
    pub fn overrides(&self, kind: RecordKind) -> &BTreeMap<String, String> {
        match kind {
            RecordKind::MenuItem => &self.menu_item_overrides,
            RecordKind::Promotion => &self.promotion_overrides,
        }
    }
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            kinds: vec![RecordKind::MenuItem, RecordKind::Promotion],
            rate_limit_ms: 2000,
            failure_delay_ms: 1000,
            keyword_search: true,
            menu_item_overrides: BTreeMap::new(),
            promotion_overrides: BTreeMap::new(),
            promotion_seed_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub kind: RecordKind,
    pub total: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionReport {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Builds stock-photo search terms from a record's names.
///
/// Uses the first name, drops stop words and words of two characters or
/// less, and joins up to three keywords with `+`. Falls back to the whole
/// name when nothing is left.
pub fn search_term(names: &[String]) -> String {
    let name = names
        .first()
        .map(|name| name.trim().to_lowercase())
        .unwrap_or_default();

    let keywords: Vec<&str> = name
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(word) && word.chars().count() > 2)
        .take(MAX_KEYWORDS)
        .collect();

    if keywords.is_empty() {
        name.replace(' ', "+").chars().take(MAX_FALLBACK_TERM_CHARS).collect()
    } else {
        keywords.join("+")
    }
}

/// `"{id}_{name}.{ext}"` with everything but alphanumerics, space, `-`, `_` and `.` removed.
pub fn upload_file_name(record: &StoreRecord, extension: &str) -> String {
    format!("{}_{}.{}", record.id, record.display_name(), extension)
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Outcome of a full seeding run.
#[derive(Debug)]
pub struct RunReport {
    pub promotions: PromotionReport,
    pub images: Vec<(RecordKind, Result<SeedReport, ApiError>)>,
}

pub struct Seeder {
    store: Arc<dyn RecordStore>,
    source: Arc<dyn ImageSource>,
    config: SeedingConfig,
}

impl Seeder {
    pub fn new(store: Arc<dyn RecordStore>, source: Arc<dyn ImageSource>, config: SeedingConfig) -> Self {
        Self {
            store,
            source,
            config,
        }
    }

    fn query_for(&self, record: &StoreRecord) -> Option<ImageQuery> {
        let overrides = self.config.overrides(record.kind);
        let explicit = record.names.iter().find_map(|name| overrides.get(name));
        if let Some(url) = explicit {
            return Some(ImageQuery::Direct(url.clone()));
        }

        if !self.config.keyword_search {
            return None;
        }
        let term = search_term(&record.names);
        (!term.is_empty()).then_some(ImageQuery::Keywords(term))
    }

    async fn pause(millis: u64) {
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    /// Attaches an image to every record of `kind` that does not have one yet.
    pub async fn seed_images(&self, kind: RecordKind) -> Result<SeedReport, ApiError> {
        info!("🖼️ Adding images to {}s...", kind);
        let records = self.store.list_records(kind).await?;
        let total = records.len();
        info!("Found {} {}s", total, kind);

        let mut queue = SeedQueue::new();
        let ids: Vec<_> = records.iter().map(|record| queue.add_record(record)).collect();

        for name in self.config.overrides(kind).keys() {
            if !records.iter().any(|record| record.is_named(name)) {
                warn!("❌ {} {} not found", kind, name);
                queue.add_missing(kind, name);
            }
        }

        for (index, (record, item_id)) in records.iter().zip(ids).enumerate() {
            let position = index + 1;
            let name = record.display_name();
            let Some(item) = queue.get_item_mut_by_id(item_id) else {
                continue;
            };

            if record.has_image {
                info!("[{}/{}] ⏭️  Skipped: {} (already has an image)", position, total, name);
                item.skip("already has an image".to_string());
                continue;
            }

            let Some(query) = self.query_for(record) else {
                info!("[{}/{}] ⏭️  Skipped: {} (no image source)", position, total, name);
                item.skip("no image source".to_string());
                continue;
            };

            info!("[{}/{}] 🔍 Searching: {}", position, total, name);
            info!("  Query: {:?}", query);
            item.start_fetch();

            let image = match self.source.fetch(&query).await {
                Ok(image) => image,
                Err(e) => {
                    if e.is_not_found() {
                        warn!("  ❌ {}", e);
                    } else {
                        warn!("  ⚠ {} (try again later)", e);
                    }
                    item.fail(e.to_string());
                    Self::pause(self.config.failure_delay_ms).await;
                    continue;
                }
            };

            let file_name = upload_file_name(record, image.extension());
            info!("  💾 Saving {} ({} bytes from {})", file_name, image.bytes.len(), image.source_url);
            match self.store.attach_image(record, &file_name, &image).await {
                Ok(()) => {
                    info!("  ✅ Added image for {}", name);
                    item.complete();
                }
                Err(e) => {
                    warn!("  ❌ Failed to save image for {}: {}", name, e);
                    item.fail(e.to_string());
                }
            }

            Self::pause(self.config.rate_limit_ms).await;
        }

        let stats = queue.get_stats();
        Ok(SeedReport {
            kind,
            total: stats.total,
            updated: stats.completed,
            skipped: stats.skipped,
            failed: stats.failed,
        })
    }

    /// Creates every draft whose title is not taken yet.
    pub async fn seed_promotions(&self, drafts: &[PromotionDraft]) -> PromotionReport {
        info!("🎉 Adding new promotions...");
        let mut report = PromotionReport::default();

        for draft in drafts {
            match self.store.promotion_exists(&draft.title).await {
                Ok(true) => {
                    info!("⏭️  Promotion {} already exists", draft.title);
                    report.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("❌ Could not look up promotion {}: {}", draft.title, e);
                    report.failed += 1;
                    continue;
                }
            }

            match self.store.create_promotion(draft).await {
                Ok(()) => {
                    info!("✅ Created new promotion: {}", draft.title);
                    report.created += 1;
                }
                Err(e) => {
                    warn!("❌ Failed to create promotion {}: {}", draft.title, e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Creates `drafts`, then seeds images for every configured kind, so
    /// promotions created here get their images in the same run.
    pub async fn run(&self, drafts: &[PromotionDraft]) -> RunReport {
        let promotions = if drafts.is_empty() {
            PromotionReport::default()
        } else {
            self.seed_promotions(drafts).await
        };

        let mut images = Vec::new();
        for kind in &self.config.kinds {
            images.push((*kind, self.seed_images(*kind).await));
        }

        RunReport { promotions, images }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_source::{FetchError, FetchedImage};
    use crate::logo_pipeline::encode_png;
    use crate::promotions::Discount;
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        records: Vec<StoreRecord>,
        created: Mutex<Vec<StoreRecord>>,
        promotions: Mutex<Vec<String>>,
        uploads: Mutex<Vec<(u64, String)>>,
        reject_uploads_for: Option<u64>,
    }

    #[async_trait]
    impl RecordStore for FakeStore {
        async fn list_records(&self, kind: RecordKind) -> Result<Vec<StoreRecord>, ApiError> {
            let created = self.created.lock().unwrap();
            Ok(self
                .records
                .iter()
                .chain(created.iter())
                .filter(|r| r.kind == kind)
                .cloned()
                .collect())
        }

        async fn attach_image(
            &self,
            record: &StoreRecord,
            file_name: &str,
            _image: &FetchedImage,
        ) -> Result<(), ApiError> {
            if self.reject_uploads_for == Some(record.id) {
                return Err(ApiError::ApiError {
                    message: "HTTP 400 Bad Request: invalid image".to_string(),
                });
            }
            self.uploads.lock().unwrap().push((record.id, file_name.to_string()));
            Ok(())
        }

        async fn promotion_exists(&self, title: &str) -> Result<bool, ApiError> {
            Ok(self.promotions.lock().unwrap().iter().any(|t| t == title))
        }

        async fn create_promotion(&self, draft: &PromotionDraft) -> Result<(), ApiError> {
            self.promotions.lock().unwrap().push(draft.title.clone());
            let mut created = self.created.lock().unwrap();
            let id = 100 + created.len() as u64;
            created.push(StoreRecord {
                id,
                kind: RecordKind::Promotion,
                names: vec![draft.title.clone()],
                has_image: false,
            });
            Ok(())
        }
    }

    /// Serves a PNG for known queries and "not found" for everything else.
    #[derive(Default)]
    struct FakeSource {
        known: HashSet<ImageQuery>,
        seen: Mutex<Vec<ImageQuery>>,
    }

    impl FakeSource {
        fn serving(queries: &[ImageQuery]) -> Self {
            Self {
                known: queries.iter().cloned().collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ImageSource for FakeSource {
        async fn fetch(&self, query: &ImageQuery) -> Result<FetchedImage, FetchError> {
            self.seen.lock().unwrap().push(query.clone());
            if !self.known.contains(query) {
                return Err(FetchError::NotFound(format!("{:?}", query)));
            }
            let png = encode_png(&RgbaImage::from_pixel(1, 1, Rgba([9, 9, 9, 255]))).unwrap();
            FetchedImage::from_bytes(png, "https://images.example/photo")
        }
    }

    fn menu_item(id: u64, name: &str, has_image: bool) -> StoreRecord {
        StoreRecord {
            id,
            kind: RecordKind::MenuItem,
            names: vec![name.to_string()],
            has_image,
        }
    }

    fn quiet_config() -> SeedingConfig {
        SeedingConfig {
            rate_limit_ms: 0,
            failure_delay_ms: 0,
            ..SeedingConfig::default()
        }
    }

    #[test]
    fn test_search_term_drops_stop_words_and_short_words() {
        let names = vec!["Katta Pitsa Margarita bilan go'sht".to_string()];
        assert_eq!(search_term(&names), "margarita+bilan+go'sht");
    }

    #[test]
    fn test_search_term_falls_back_to_whole_name() {
        assert_eq!(search_term(&["Big Pizza".to_string()]), "big+pizza");
        let long = "ab ".repeat(30);
        assert_eq!(search_term(&[long]).chars().count(), MAX_FALLBACK_TERM_CHARS);
        assert_eq!(search_term(&[]), "");
    }

    #[test]
    fn test_upload_file_name_is_sanitized() {
        let record = menu_item(42, "Mochi Ice Cream / Matcha!", false);
        assert_eq!(upload_file_name(&record, "jpg"), "42_Mochi Ice Cream  Matcha.jpg");
    }

    #[tokio::test]
    async fn test_seed_images_skips_fetches_and_uploads() {
        let store = Arc::new(FakeStore {
            records: vec![
                menu_item(1, "Tonkotsu Ramen", false),
                menu_item(2, "Gyoza", true),
                menu_item(3, "Unknown Dish", false),
            ],
            ..FakeStore::default()
        });
        let source = Arc::new(FakeSource::serving(&[ImageQuery::Keywords(
            "tonkotsu+ramen".to_string(),
        )]));
        let seeder = Seeder::new(store.clone(), source.clone(), quiet_config());

        let report = seeder.seed_images(RecordKind::MenuItem).await.unwrap();

        assert_eq!(
            report,
            SeedReport {
                kind: RecordKind::MenuItem,
                total: 3,
                updated: 1,
                skipped: 1,
                failed: 1,
            }
        );
        assert_eq!(
            *store.uploads.lock().unwrap(),
            vec![(1, "1_Tonkotsu Ramen.png".to_string())]
        );
        // Records that already have an image are never looked up.
        assert_eq!(source.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_overrides_win_and_unknown_names_count_as_failures() {
        let url = "https://images.unsplash.com/photo-1579584425555".to_string();
        let store = Arc::new(FakeStore {
            records: vec![menu_item(5, "California Roll", false), menu_item(6, "Edamame", false)],
            ..FakeStore::default()
        });
        let source = Arc::new(FakeSource::serving(&[ImageQuery::Direct(url.clone())]));

        let mut config = quiet_config();
        config.keyword_search = false;
        config.menu_item_overrides.insert("California Roll".to_string(), url.clone());
        config.menu_item_overrides.insert("Dragon Roll".to_string(), url.clone());
        let seeder = Seeder::new(store.clone(), source.clone(), config);

        let report = seeder.seed_images(RecordKind::MenuItem).await.unwrap();

        assert_eq!((report.total, report.updated, report.skipped, report.failed), (3, 1, 1, 1));
        assert_eq!(*source.seen.lock().unwrap(), vec![ImageQuery::Direct(url)]);
    }

    #[tokio::test]
    async fn test_rejected_upload_is_counted_as_failure() {
        let store = Arc::new(FakeStore {
            records: vec![menu_item(9, "Sake", false)],
            reject_uploads_for: Some(9),
            ..FakeStore::default()
        });
        let source = Arc::new(FakeSource::serving(&[ImageQuery::Keywords("sake".to_string())]));
        let seeder = Seeder::new(store.clone(), source, quiet_config());

        let report = seeder.seed_images(RecordKind::MenuItem).await.unwrap();
        assert_eq!((report.updated, report.failed), (0, 1));
        assert!(store.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overrides_only_apply_to_their_own_kind() {
        let url = "https://images.unsplash.com/photo-1496116218417".to_string();
        let store = Arc::new(FakeStore {
            records: vec![
                menu_item(1, "Gyoza", true),
                StoreRecord {
                    id: 2,
                    kind: RecordKind::Promotion,
                    names: vec!["Happy Hour".to_string()],
                    has_image: true,
                },
            ],
            ..FakeStore::default()
        });
        let mut config = quiet_config();
        config.menu_item_overrides.insert("Gyoza".to_string(), url.clone());
        config.promotion_overrides.insert("Happy Hour".to_string(), url);
        let seeder = Seeder::new(store, Arc::new(FakeSource::default()), config);

        let menu = seeder.seed_images(RecordKind::MenuItem).await.unwrap();
        let promo = seeder.seed_images(RecordKind::Promotion).await.unwrap();

        assert_eq!((menu.total, menu.skipped, menu.failed), (1, 1, 0));
        assert_eq!((promo.total, promo.skipped, promo.failed), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_seed_promotions_is_idempotent() {
        let store = Arc::new(FakeStore {
            promotions: Mutex::new(vec!["Happy Hour".to_string()]),
            ..FakeStore::default()
        });
        let seeder = Seeder::new(store.clone(), Arc::new(FakeSource::default()), quiet_config());
        let drafts = vec![
            PromotionDraft {
                title: "Happy Hour".to_string(),
                description: "Two drinks for one".to_string(),
                discount: Discount::Percentage(50),
                duration_days: 365,
                is_active: true,
            },
            PromotionDraft {
                title: "Student Discount".to_string(),
                description: "15% off for students with valid ID".to_string(),
                discount: Discount::Percentage(15),
                duration_days: 365,
                is_active: true,
            },
        ];

        let first = seeder.seed_promotions(&drafts).await;
        let second = seeder.seed_promotions(&drafts).await;

        assert_eq!(first, PromotionReport { created: 1, skipped: 1, failed: 0 });
        assert_eq!(second, PromotionReport { created: 0, skipped: 2, failed: 0 });
    }

    #[tokio::test]
    async fn test_run_gives_new_promotions_images_in_the_same_run() {
        let store = Arc::new(FakeStore::default());
        let source = Arc::new(FakeSource::serving(&[ImageQuery::Keywords(
            "sushi+night".to_string(),
        )]));
        let seeder = Seeder::new(store.clone(), source, quiet_config());
        let drafts = vec![PromotionDraft {
            title: "Sushi Night".to_string(),
            description: "Unlimited rolls on Fridays".to_string(),
            discount: Discount::Percentage(20),
            duration_days: 365,
            is_active: true,
        }];

        let report = seeder.run(&drafts).await;

        assert_eq!(report.promotions.created, 1);
        let kinds: Vec<_> = report.images.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, vec![RecordKind::MenuItem, RecordKind::Promotion]);
        let promo = report.images[1].1.as_ref().unwrap();
        assert_eq!((promo.total, promo.updated, promo.failed), (1, 1, 0));
        assert_eq!(
            *store.uploads.lock().unwrap(),
            vec![(100, "100_Sushi Night.png".to_string())]
        );
    }
}
