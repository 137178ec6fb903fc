//! Slippy-map tile provider abstraction
//!
//! This module provides the [`AsyncProvider`] trait and implementations for
//! downloading XYZ tiles from imagery services (ArcGIS, OpenStreetMap,
//! Google, USGS, or any URL template).
//!
//! # Factory Pattern
//!
//! For centralized provider creation, use the [`ProviderFactory`]:
//!
//! ```ignore
//! use tilestitch::provider::{AsyncReqwestClient, ProviderConfig, ProviderFactory};
//!
//! let http_client = AsyncReqwestClient::new()?;
//! let provider = ProviderFactory::new(http_client).create(&ProviderConfig::ArcGis)?;
//! ```

mod arcgis;
mod factory;
mod google;
mod http;
mod template;
mod types;
mod usgs;

pub use arcgis::ArcGisProvider;
pub use factory::{ProviderConfig, ProviderFactory, TileProviderKind};
pub use google::GoogleMapsProvider;
pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use template::{TemplateProvider, OSM_URL_TEMPLATE};
pub use types::{AsyncProvider, ProviderError};
pub use usgs::UsgsProvider;

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
