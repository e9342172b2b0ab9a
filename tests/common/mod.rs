//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use libris_server::{
    clock::ManualClock,
    config::LendingConfig,
    models::{CreateItem, Item, Patron, PatronRole, PatronStatus},
    repository::{MemoryStore, Repository},
    services::Services,
};

pub struct Fixture {
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
    pub services: Services,
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap()
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(start()));
        let services = Services::new(
            Repository::new(store.clone()),
            &LendingConfig::default(),
            clock.clone(),
        );
        Self {
            store,
            clock,
            services,
        }
    }

    pub async fn patron(&self, username: &str) -> Patron {
        self.store
            .add_patron(username, PatronRole::Member, PatronStatus::Enabled)
            .await
    }

    pub async fn admin(&self, username: &str) -> Patron {
        self.store
            .add_patron(username, PatronRole::Admin, PatronStatus::Enabled)
            .await
    }

    pub async fn item(&self, isbn: &str, total: i32) -> Item {
        self.services
            .catalog
            .create_item(create_item(isbn, total))
            .await
            .unwrap()
    }

    pub async fn reload(&self, item: &Item) -> Item {
        self.services.catalog.get_item(item.id).await.unwrap()
    }
}

pub fn create_item(isbn: &str, total: i32) -> CreateItem {
    CreateItem {
        isbn: isbn.to_string(),
        title: "A Wizard of Earthsea".to_string(),
        author: "Ursula K. Le Guin".to_string(),
        publisher: Some("Parnassus Press".to_string()),
        category: Some("Fantasy".to_string()),
        price: None,
        location: Some("F-12".to_string()),
        cover: None,
        summary: None,
        total,
    }
}
