pub mod analytics;
pub mod archive;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod free_entry;
pub mod models;
pub mod moscow;
pub mod query;
pub mod season;
pub mod share;
pub mod slug;
pub mod tickets;

#[cfg(test)]
mod test_support;

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use analytics::{Analytics, NoopAnalytics};
use cart::{Cart, CouponError, Totals};
use config::{AppConfig, ConfigStore, EnvOverrides};
use db::Store;
use free_entry::EventsConfig;
use models::{CartItem, Event};
use query::QueryCache;
use share::SharePreview;
use slug::SlugResolution;
use tickets::{TicketsCloud, TicketsError};

const EVENTS_QUERY: &str = "events";
const DEFAULT_LOG_FILTER: &str = "vnvnc_core=info";

#[derive(Debug, Clone, Serialize)]
pub struct EventCard {
    pub event: Event,
    pub slug: String,
    pub is_free: bool,
    pub is_archived: bool,
    pub price_label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventsView {
    pub current: Vec<EventCard>,
    pub archive: Vec<EventCard>,
    pub load_failed: bool,
}

impl EventsView {
    pub fn archive_for(&self, chip: &str) -> Vec<&EventCard> {
        let month = archive::parse_month_filter(chip);
        self.archive
            .iter()
            .filter(|card| archive::in_month(&card.event, month))
            .collect()
    }
}

pub fn build_listing(events: &[Event], now: &DateTime<Utc>, config: &EventsConfig) -> EventsView {
    let counts = slug::same_date_counts(events);
    let card = |event: &Event, is_archived: bool| EventCard {
        event: event.clone(),
        slug: slug::slug_with_counts(event, &counts),
        is_free: config.is_free(event),
        is_archived,
        price_label: event.price_label(),
    };

    let listing = archive::partition(events, now);
    EventsView {
        current: listing.current.into_iter().map(|e| card(e, false)).collect(),
        archive: listing.archive.into_iter().map(|e| card(e, true)).collect(),
        load_failed: false,
    }
}

#[derive(Default)]
pub struct ContextOptions {
    pub config_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    /// Read from the process environment when unset.
    pub env_overrides: Option<EnvOverrides>,
    pub analytics: Option<Arc<dyn Analytics>>,
}

pub struct AppContext {
    config: ConfigStore,
    store: Mutex<Store>,
    tickets: TicketsCloud,
    events_query: QueryCache<Vec<Event>>,
    analytics: Arc<dyn Analytics>,
    service_worker: AtomicBool,
    cart: Mutex<Cart>,
}

impl AppContext {
    /// Installs the fmt subscriber; `RUST_LOG` overrides the default filter.
    /// A subscriber installed earlier is left in place.
    pub fn init_tracing() {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    }

    pub fn init(options: ContextOptions) -> anyhow::Result<Self> {
        let config_path = options
            .config_path
            .unwrap_or_else(config::default_config_path);
        let overrides = options.env_overrides.unwrap_or_else(EnvOverrides::from_env);
        let config = ConfigStore::with_overrides(config_path, overrides);
        let settings = config.read();

        let database_path = options
            .database_path
            .unwrap_or_else(config::default_database_path);
        let store = Store::open(&database_path)
            .with_context(|| format!("failed to open store at {}", database_path.display()))?;
        let items = match store.load_cart() {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable saved cart");
                Vec::new()
            }
        };

        let tickets = TicketsCloud::from_config(&settings.tickets)
            .context("failed to build ticketing client")?;

        tracing::info!(
            config = %config.path().display(),
            database = %database_path.display(),
            cart_lines = items.len(),
            "context initialised"
        );

        Ok(Self {
            config,
            store: Mutex::new(store),
            tickets,
            events_query: QueryCache::new(settings.query),
            analytics: options
                .analytics
                .unwrap_or_else(|| Arc::new(NoopAnalytics)),
            service_worker: AtomicBool::new(false),
            cart: Mutex::new(Cart::from_items(items)),
        })
    }

    pub fn shutdown(self) -> anyhow::Result<()> {
        let cart = self.cart.into_inner().unwrap_or_else(PoisonError::into_inner);
        self.store
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .save_cart(cart.items())
            .context("failed to persist cart on shutdown")?;
        self.events_query.clear();
        tracing::info!(cart_lines = cart.items().len(), "context shut down");
        Ok(())
    }

    pub fn config(&self) -> AppConfig {
        self.config.read()
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config
    }

    pub fn register_service_worker(&self) -> bool {
        let first = !self.service_worker.swap(true, Ordering::SeqCst);
        if first {
            tracing::debug!("service worker registered");
        }
        first
    }

    pub async fn events(&self) -> Result<Vec<Event>, TicketsError> {
        self.events_query
            .fetch(EVENTS_QUERY, || self.tickets.events())
            .await
    }

    pub async fn refresh_events(&self) -> Result<Vec<Event>, TicketsError> {
        self.events_query.invalidate(EVENTS_QUERY);
        self.events().await
    }

    pub async fn search_events(&self, title: &str) -> Result<Vec<Event>, TicketsError> {
        let key = format!("{EVENTS_QUERY}:search:{}", title.trim().to_lowercase());
        self.events_query
            .fetch(&key, || self.tickets.search(title))
            .await
    }

    pub async fn event_details(&self, event_id: &str) -> Result<Event, TicketsError> {
        query::with_retry(self.events_query.policy(), "event_details", || {
            self.tickets.event_details(event_id)
        })
        .await
    }

    pub async fn event_listing(&self, now: &DateTime<Utc>) -> EventsView {
        match self.events().await {
            Ok(events) => build_listing(&events, now, &self.config.read().events),
            Err(err) => {
                tracing::warn!(error = %err, "events unavailable");
                EventsView {
                    load_failed: true,
                    ..EventsView::default()
                }
            }
        }
    }

    pub async fn resolve(&self, slug: &str) -> SlugResolution {
        match self.events().await {
            Ok(events) => slug::resolve_slug(slug, &events),
            Err(err) => {
                tracing::warn!(error = %err, slug, "cannot resolve slug without events");
                SlugResolution::Redirect(slug::LISTING_PATH)
            }
        }
    }

    pub async fn share_preview(&self, slug: &str) -> SharePreview {
        let events = match self.events().await {
            Ok(events) => events,
            Err(err) => {
                tracing::warn!(error = %err, slug, "share preview falls back to defaults");
                return share::preview_for(None, slug);
            }
        };
        let event = match slug::resolve_slug(slug, &events) {
            SlugResolution::Event(id) => events.iter().find(|e| e.id == id),
            SlugResolution::Redirect(_) => None,
        };
        share::preview_for(event, slug)
    }

    pub fn is_seasonal(&self, now: &DateTime<Utc>) -> bool {
        self.config.read().seasonal_window.contains(Some(now))
    }

    pub fn is_free(&self, event: &Event) -> bool {
        self.config.read().events.is_free(event)
    }

    pub fn track_ticket_click(&self, event: &Event) {
        self.analytics.track_event(
            "ticket_click",
            &json!({ "event_id": event.id, "title": event.title }),
        );
    }

    pub fn cart_items(&self) -> Vec<CartItem> {
        self.lock_cart().items().to_vec()
    }

    pub fn cart_totals(&self) -> Totals {
        self.lock_cart().totals()
    }

    pub fn add_to_cart(&self, product_id: &str, variant_id: &str) -> bool {
        let Some(product) = catalog::find_product(product_id) else {
            return false;
        };
        let mut cart = self.lock_cart();
        if !cart.add(&product, variant_id) {
            return false;
        }
        self.persist(&cart);
        self.analytics.track_event(
            "add_to_cart",
            &json!({ "product_id": product_id, "variant_id": variant_id }),
        );
        true
    }

    pub fn update_quantity(&self, product_id: &str, variant_id: &str, delta: i64) {
        let mut cart = self.lock_cart();
        cart.update_quantity(product_id, variant_id, delta);
        self.persist(&cart);
    }

    pub fn remove_from_cart(&self, product_id: &str, variant_id: &str) {
        let mut cart = self.lock_cart();
        cart.remove(product_id, variant_id);
        self.persist(&cart);
        self.analytics.track_event(
            "remove_from_cart",
            &json!({ "product_id": product_id, "variant_id": variant_id }),
        );
    }

    pub fn clear_cart(&self) {
        let mut cart = self.lock_cart();
        cart.clear();
        self.persist(&cart);
    }

    pub fn apply_coupon(&self, code: &str) -> Result<Totals, CouponError> {
        let mut cart = self.lock_cart();
        let totals = cart.apply_coupon(&catalog::coupons(), code)?;
        self.analytics.track_event(
            "coupon_applied",
            &json!({ "code": code.trim().to_uppercase(), "discount": totals.discount }),
        );
        Ok(totals)
    }

    pub fn remove_coupon(&self) {
        self.lock_cart().remove_coupon();
    }

    fn lock_cart(&self) -> std::sync::MutexGuard<'_, Cart> {
        self.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, cart: &Cart) {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = store.save_cart(cart.items()) {
            tracing::warn!(error = %err, "failed to persist cart");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use analytics::RecordingAnalytics;
    use test_support::event_at;

    fn context(dir: &tempfile::TempDir, analytics: Arc<dyn Analytics>) -> AppContext {
        AppContext::init(ContextOptions {
            config_path: Some(dir.path().join("config.json")),
            database_path: Some(dir.path().join("vnvnc.sqlite")),
            env_overrides: Some(EnvOverrides::default()),
            analytics: Some(analytics),
        })
        .expect("context")
    }

    #[test]
    fn listing_marks_slugs_free_and_archive() {
        let sunday = Utc.with_ymd_and_hms(2024, 12, 15, 20, 0, 0).unwrap();
        let friday = Utc.with_ymd_and_hms(2024, 12, 20, 20, 0, 0).unwrap();
        let mut free = event_at("free0001", Some(sunday));
        free.title = "Все свои".to_string();
        let paid = event_at("paid0001", Some(friday));
        let undated = event_at("nodate01", None);

        let now = Utc.with_ymd_and_hms(2024, 12, 17, 12, 0, 0).unwrap();
        let view = build_listing(&[paid, free, undated], &now, &EventsConfig::default());

        assert!(!view.load_failed);
        assert_eq!(view.current.len(), 1);
        assert_eq!(view.current[0].slug, "20-12-24");
        assert!(!view.current[0].is_free);
        assert_eq!(view.archive.len(), 1);
        assert!(view.archive[0].is_archived);
        assert!(view.archive[0].is_free);
        assert_eq!(view.archive[0].slug, "15-12-24");
        assert_eq!(view.archive_for("12").len(), 1);
        assert!(view.archive_for("11").is_empty());
        assert_eq!(view.archive_for("all").len(), 1);
    }

    #[test]
    fn cart_survives_restart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(RecordingAnalytics::default());

        let ctx = context(&dir, recorder.clone());
        assert!(ctx.add_to_cart("hoodie-red-2025", "hr-m"));
        assert!(ctx.add_to_cart("hoodie-red-2025", "hr-m"));
        assert!(!ctx.add_to_cart("hoodie-red-2025", "missing"));
        assert!(!ctx.add_to_cart("unknown", "hr-m"));
        ctx.update_quantity("hoodie-red-2025", "hr-m", -5);
        assert_eq!(ctx.cart_items()[0].quantity, 1);
        ctx.shutdown().expect("shutdown");

        let ctx = context(&dir, recorder.clone());
        assert_eq!(ctx.cart_totals().subtotal, 5000);
        assert_eq!(recorder.names(), vec!["add_to_cart", "add_to_cart"]);

        ctx.remove_from_cart("hoodie-red-2025", "hr-m");
        assert!(ctx.cart_items().is_empty());
    }

    #[test]
    fn coupon_errors_leave_totals_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(RecordingAnalytics::default());
        let ctx = context(&dir, recorder.clone());
        assert!(ctx.add_to_cart("t-shirt-blue-2025", "tsb-m"));

        assert_eq!(ctx.apply_coupon("nope"), Err(CouponError::Invalid));
        assert_eq!(
            ctx.apply_coupon("friends"),
            Err(CouponError::BelowMinimum { min_amount: 3000 })
        );
        assert_eq!(ctx.cart_totals().total, 2500);

        let totals = ctx.apply_coupon(" vnvnc2025 ").expect("coupon");
        assert_eq!(totals.discount, 250);
        assert_eq!(totals.total, 2250);
        assert!(recorder.names().contains(&"coupon_applied".to_string()));

        ctx.remove_coupon();
        assert_eq!(ctx.cart_totals().total, 2500);
    }

    #[test]
    fn service_worker_registers_once() {
        AppContext::init_tracing();
        AppContext::init_tracing();
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir, Arc::new(NoopAnalytics));
        assert!(ctx.register_service_worker());
        assert!(!ctx.register_service_worker());
    }

    #[tokio::test]
    async fn missing_key_degrades_to_empty_listing() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("config.json"), r#"{"query": {"retries": 0}}"#)
            .expect("config");
        let ctx = context(&dir, Arc::new(NoopAnalytics));
        let now = Utc.with_ymd_and_hms(2024, 12, 17, 12, 0, 0).unwrap();

        let view = ctx.event_listing(&now).await;
        assert!(view.load_failed);
        assert!(view.current.is_empty() && view.archive.is_empty());
        assert_eq!(ctx.resolve("15-12-24").await, SlugResolution::Redirect("/events"));
        assert_eq!(ctx.share_preview("15-12-24").await.title, share::DEFAULT_TITLE);
    }

    #[test]
    fn seasonal_window_follows_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir, Arc::new(NoopAnalytics));
        let halloween = Utc.with_ymd_and_hms(2025, 10, 31, 18, 0, 0).unwrap();
        let spring = Utc.with_ymd_and_hms(2025, 4, 1, 18, 0, 0).unwrap();
        assert!(ctx.is_seasonal(&halloween));
        assert!(!ctx.is_seasonal(&spring));
    }
}
