//! Menu catalog with in-memory caching
//!
//! Read-only cache of dishes per meal type, refreshed from an
//! injected source on a TTL (24h by default) or out-of-band via
//! `force_refresh`. Stale reads are acceptable; a failed refresh
//! must leave the previous cache in place.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;

use shared::menu::Dish;
use shared::order::MealType;

use crate::utils::clock::Clock;

/// Catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Menu source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Menu source returned malformed data: {0}")]
    Parse(String),

    #[error("Dish not on the {meal} menu: {dish}")]
    UnknownDish { meal: MealType, dish: String },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Menu source seam: whatever the menu actually lives in
/// (spreadsheet, file, fixture) fetches one meal-type bucket at a time
#[async_trait]
pub trait MenuSource: Send + Sync {
    async fn fetch(&self, meal: MealType) -> CatalogResult<Vec<Dish>>;
}

/// One cached meal-type bucket
#[derive(Debug, Clone)]
struct Bucket {
    dishes: Vec<Dish>,
    refreshed_at: DateTime<Utc>,
}

/// TTL-cached menu catalog
pub struct MenuCatalog {
    source: Arc<dyn MenuSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    buckets: RwLock<HashMap<MealType, Bucket>>,
}

impl std::fmt::Debug for MenuCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buckets = self.buckets.read();
        f.debug_struct("MenuCatalog")
            .field("ttl", &self.ttl)
            .field("buckets", &buckets.len())
            .finish()
    }
}

impl MenuCatalog {
    pub fn new(source: Arc<dyn MenuSource>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            source,
            clock,
            ttl,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Cached dish list for a meal type, refreshing first when the
    /// bucket is missing or older than the TTL
    pub async fn get_dishes(&self, meal: MealType) -> CatalogResult<Vec<Dish>> {
        if let Some(dishes) = self.fresh_bucket(meal) {
            return Ok(dishes);
        }

        match self.refresh_bucket(meal).await {
            Ok(dishes) => Ok(dishes),
            Err(e) => {
                // Stale cache beats no cache: serve the old bucket if
                // one exists, surface the error only on a cold start
                let stale = self.buckets.read().get(&meal).map(|b| b.dishes.clone());
                match stale {
                    Some(dishes) => {
                        tracing::warn!(meal = %meal, error = %e, "Menu refresh failed, serving stale bucket");
                        Ok(dishes)
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Unit price of a dish on the given meal's menu
    pub async fn price_of(&self, meal: MealType, dish: &str) -> CatalogResult<i64> {
        let dishes = self.get_dishes(meal).await?;
        dishes
            .iter()
            .find(|d| d.name == dish)
            .map(|d| d.price)
            .ok_or_else(|| CatalogError::UnknownDish {
                meal,
                dish: dish.to_string(),
            })
    }

    /// Repopulate all three meal-type buckets, bypassing the TTL.
    /// Buckets whose fetch fails keep their previous contents.
    pub async fn force_refresh(&self) -> CatalogResult<()> {
        let mut first_error = None;
        for meal in MealType::ALL {
            if let Err(e) = self.refresh_bucket(meal).await {
                tracing::error!(meal = %meal, error = %e, "Force refresh failed for bucket");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!("Menu catalog force-refreshed");
                Ok(())
            }
        }
    }

    fn fresh_bucket(&self, meal: MealType) -> Option<Vec<Dish>> {
        let buckets = self.buckets.read();
        let bucket = buckets.get(&meal)?;
        let age = self
            .clock
            .now()
            .signed_duration_since(bucket.refreshed_at)
            .to_std()
            .unwrap_or_default();
        if age < self.ttl {
            Some(bucket.dishes.clone())
        } else {
            None
        }
    }

    /// Fetch and fully replace one bucket (last write wins)
    async fn refresh_bucket(&self, meal: MealType) -> CatalogResult<Vec<Dish>> {
        let dishes = self.source.fetch(meal).await?;
        let bucket = Bucket {
            dishes: dishes.clone(),
            refreshed_at: self.clock.now(),
        };
        self.buckets.write().insert(meal, bucket);
        tracing::debug!(meal = %meal, dishes = dishes.len(), "Menu bucket refreshed");
        Ok(dishes)
    }
}

// =============================================================================
// JsonMenuSource
// =============================================================================

/// File layout for the JSON-backed menu source
#[derive(Debug, serde::Deserialize)]
struct MenuFile {
    #[serde(default)]
    breakfast: Vec<Dish>,
    #[serde(default)]
    lunch: Vec<Dish>,
    #[serde(default)]
    dinner: Vec<Dish>,
}

/// Menu source backed by a JSON file on disk, used by the daemon
pub struct JsonMenuSource {
    path: PathBuf,
}

impl JsonMenuSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MenuSource for JsonMenuSource {
    async fn fetch(&self, meal: MealType) -> CatalogResult<Vec<Dish>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CatalogError::SourceUnavailable(format!("{}: {}", self.path.display(), e)))?;
        let file: MenuFile =
            serde_json::from_str(&raw).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(match meal {
            MealType::Breakfast => file.breakfast,
            MealType::Lunch => file.lunch,
            MealType::Dinner => file.dinner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::FixedClock;
    use chrono::TimeZone;
    use parking_lot::Mutex;

    /// Scripted source: per-meal dish lists, optional failure switch
    struct ScriptedSource {
        dishes: Mutex<HashMap<MealType, Vec<Dish>>>,
        fail: Mutex<bool>,
        fetch_count: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new() -> Self {
            let mut dishes = HashMap::new();
            dishes.insert(
                MealType::Lunch,
                vec![Dish::new("Soup", 150, "300 г"), Dish::new("Steak", 400, "250 г")],
            );
            dishes.insert(MealType::Breakfast, vec![Dish::new("Kasha", 90, "200 г")]);
            dishes.insert(MealType::Dinner, vec![Dish::new("Fish", 320, "220 г")]);
            Self {
                dishes: Mutex::new(dishes),
                fail: Mutex::new(false),
                fetch_count: Mutex::new(0),
            }
        }

        fn set_fail(&self, fail: bool) {
            *self.fail.lock() = fail;
        }

        fn set_price(&self, meal: MealType, dish: &str, price: i64) {
            let mut dishes = self.dishes.lock();
            if let Some(bucket) = dishes.get_mut(&meal) {
                if let Some(d) = bucket.iter_mut().find(|d| d.name == dish) {
                    d.price = price;
                }
            }
        }

        fn fetches(&self) -> u32 {
            *self.fetch_count.lock()
        }
    }

    #[async_trait]
    impl MenuSource for ScriptedSource {
        async fn fetch(&self, meal: MealType) -> CatalogResult<Vec<Dish>> {
            *self.fetch_count.lock() += 1;
            if *self.fail.lock() {
                return Err(CatalogError::SourceUnavailable("scripted failure".into()));
            }
            Ok(self.dishes.lock().get(&meal).cloned().unwrap_or_default())
        }
    }

    fn catalog_with(
        source: Arc<ScriptedSource>,
        clock: Arc<FixedClock>,
        ttl_hours: u64,
    ) -> MenuCatalog {
        MenuCatalog::new(source, clock, Duration::from_secs(ttl_hours * 3600))
    }

    fn test_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::at(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_cache_hit_within_ttl() {
        let source = Arc::new(ScriptedSource::new());
        let clock = test_clock();
        let catalog = catalog_with(source.clone(), clock.clone(), 24);

        let first = catalog.get_dishes(MealType::Lunch).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(source.fetches(), 1);

        // Within TTL: served from cache
        clock.advance(chrono::Duration::hours(23));
        catalog.get_dishes(MealType::Lunch).await.unwrap();
        assert_eq!(source.fetches(), 1);

        // Past TTL: refreshed
        clock.advance(chrono::Duration::hours(2));
        catalog.get_dishes(MealType::Lunch).await.unwrap();
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_bucket() {
        let source = Arc::new(ScriptedSource::new());
        let clock = test_clock();
        let catalog = catalog_with(source.clone(), clock.clone(), 24);

        catalog.get_dishes(MealType::Lunch).await.unwrap();

        // Expire the bucket, then break the source
        clock.advance(chrono::Duration::hours(25));
        source.set_fail(true);

        let dishes = catalog.get_dishes(MealType::Lunch).await.unwrap();
        assert_eq!(dishes.len(), 2, "stale bucket must survive a failed refresh");

        // A cold bucket with a broken source is a real error
        let result = catalog.get_dishes(MealType::Dinner).await;
        assert!(matches!(result, Err(CatalogError::SourceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_ttl() {
        let source = Arc::new(ScriptedSource::new());
        let clock = test_clock();
        let catalog = catalog_with(source.clone(), clock.clone(), 24);

        catalog.get_dishes(MealType::Lunch).await.unwrap();
        source.set_price(MealType::Lunch, "Soup", 180);

        // TTL has not elapsed and the cache still has the old price
        assert_eq!(catalog.price_of(MealType::Lunch, "Soup").await.unwrap(), 150);

        catalog.force_refresh().await.unwrap();
        assert_eq!(catalog.price_of(MealType::Lunch, "Soup").await.unwrap(), 180);
    }

    #[tokio::test]
    async fn test_force_refresh_failure_keeps_cache_and_reports() {
        let source = Arc::new(ScriptedSource::new());
        let clock = test_clock();
        let catalog = catalog_with(source.clone(), clock.clone(), 24);

        catalog.force_refresh().await.unwrap();
        source.set_fail(true);

        let result = catalog.force_refresh().await;
        assert!(result.is_err());

        // Previous buckets still serve
        let dishes = catalog.get_dishes(MealType::Lunch).await.unwrap();
        assert_eq!(dishes.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_dish_price() {
        let source = Arc::new(ScriptedSource::new());
        let catalog = catalog_with(source, test_clock(), 24);
        let result = catalog.price_of(MealType::Lunch, "Borscht").await;
        assert!(matches!(result, Err(CatalogError::UnknownDish { .. })));
    }

    #[tokio::test]
    async fn test_json_source_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.json");
        tokio::fs::write(
            &path,
            r#"{"breakfast":[{"name":"Kasha","price":90,"weight":"200 г"}],"lunch":[],"dinner":[]}"#,
        )
        .await
        .unwrap();

        let source = JsonMenuSource::new(&path);
        let dishes = source.fetch(MealType::Breakfast).await.unwrap();
        assert_eq!(dishes, vec![Dish::new("Kasha", 90, "200 г")]);
        assert!(source.fetch(MealType::Lunch).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_source_errors() {
        let source = JsonMenuSource::new("/nonexistent/menu.json");
        assert!(matches!(
            source.fetch(MealType::Lunch).await,
            Err(CatalogError::SourceUnavailable(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.json");
        tokio::fs::write(&path, "not json").await.unwrap();
        let source = JsonMenuSource::new(&path);
        assert!(matches!(
            source.fetch(MealType::Lunch).await,
            Err(CatalogError::Parse(_))
        ));
    }
}
