//! Testing utilities and mock implementations.
//!
//! Mocks for every external seam (provider HTTP API, game catalog, cache
//! backend), so reconciliation and caching can be tested end to end without
//! network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use questlog_core::testing::{fixtures, MockGameCatalog};
//!
//! let catalog = MockGameCatalog::new();
//! catalog
//!     .set_search_results("Witcher 3", vec![fixtures::catalog_item(1942, "The Witcher 3")])
//!     .await;
//! ```

mod mock_cache;
mod mock_game_catalog;
mod mock_provider;

pub use mock_cache::{FailingCacheBackend, RecordingCacheBackend};
pub use mock_game_catalog::MockGameCatalog;
pub use mock_provider::{MockProviderApi, RecordedProviderCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::NaiveDate;

    use crate::provider::{CatalogItem, GenreRef, PlatformInfo, StoreLink};

    /// Create a catalog item with a derived slug and no optional data.
    pub fn catalog_item(provider_id: u64, name: &str) -> CatalogItem {
        CatalogItem {
            provider_id,
            name: name.to_string(),
            slug: name
                .to_lowercase()
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("-"),
            cover_url: None,
            platforms: vec![],
            franchise_name: None,
            release_date: None,
            rating: None,
            genres: vec![],
            store_links: vec![],
        }
    }

    /// Create a catalog item with every optional field populated.
    pub fn full_catalog_item(provider_id: u64, name: &str) -> CatalogItem {
        CatalogItem {
            cover_url: Some(format!(
                "https://images.igdb.com/igdb/image/upload/t_cover_big/co{}.jpg",
                provider_id
            )),
            platforms: vec![platform(6, "PC (Microsoft Windows)", Some("PC"))],
            franchise_name: Some(format!("{} Series", name)),
            release_date: NaiveDate::from_ymd_opt(2020, 1, 15),
            rating: Some(85.0),
            genres: vec![genre(12, "Role-playing (RPG)"), genre(31, "Adventure")],
            store_links: vec![StoreLink {
                slug: "steam".to_string(),
                url: format!("https://store.steampowered.com/app/{}", provider_id),
            }],
            ..catalog_item(provider_id, name)
        }
    }

    /// Create a platform record.
    pub fn platform(id: u64, name: &str, abbreviation: Option<&str>) -> PlatformInfo {
        PlatformInfo {
            provider_platform_id: id,
            name: name.to_string(),
            abbreviation: abbreviation.map(str::to_string),
        }
    }

    /// Create a genre reference.
    pub fn genre(id: u64, name: &str) -> GenreRef {
        GenreRef {
            provider_genre_id: id,
            name: name.to_string(),
        }
    }
}
