//! Kafka Info - consumer lag card
//!
//! A Leptos card that shows Kafka consumer-group lag for one catalog entity,
//! read from a Prometheus-compatible metrics endpoint behind the portal
//! backend's proxy.
//!
//! ## Configuration
//!
//! The host page injects configuration and the displayed entity as JSON:
//!
//! ```html
//! <meta name="kafka-info:config" content='{
//!   "backend": { "baseUrl": "http://localhost:7007" },
//!   "kafkaInfo": {
//!     "lagMetric": "kafka_consumergroup_lag",
//!     "clusters": [{ "name": "prod", "proxy": "prometheus-prod" }]
//!   }
//! }'>
//! <meta name="kafka-info:entity" content='{
//!   "metadata": { "name": "orders", "annotations": { "kafka-info/consumer-groups": "orders" } }
//! }'>
//! ```
//!
//! Or via `window.__KAFKA_INFO_CONFIG__` and `window.__KAFKA_INFO_ENTITY__`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  KafkaInfoCard (Leptos)                                   │
//! │    WidgetState ── FetchTicket ──▶ LagSource               │
//! │                                   ├─ InstantQuerySource   │
//! │                                   └─ ExpositionSource     │
//! │                                        │ Transport        │
//! └────────────────────────────────────────┼─────────────────┘
//!                                          │ GET /api/proxy/{proxy}/...
//!                                 ┌────────▼────────┐
//!                                 │ portal backend   │──▶ Prometheus
//!                                 └─────────────────┘
//! ```

pub mod api;
pub mod components;
pub mod config;
pub mod entity;
pub mod error;
pub mod lag;
pub mod state;

use leptos::*;

pub use components::KafkaInfoCard;
pub use config::{ClusterDescriptor, KafkaInfoConfig};
pub use entity::{is_plugin_applicable_to_entity, ConsumerGroupSet, Entity, KAFKA_INFO_ANNOTATION};
pub use error::{ConfigError, FetchError};

use components::ErrorState;

/// Standalone application: one card for the injected entity
///
/// Hosts embedding the card can gate it with [`is_plugin_applicable_to_entity`].
#[component]
pub fn App() -> impl IntoView {
    match KafkaInfoConfig::load().and_then(|config| Ok((config, Entity::load()?))) {
        Ok((config, entity)) => view! { <KafkaInfoCard config=config entity=entity/> }.into_view(),
        Err(err) => {
            tracing::error!(error = %err, "kafka-info failed to start");
            view! { <ErrorState title="Kafka Info" message=err.to_string()/> }.into_view()
        }
    }
}

/// Mount the application to the DOM
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    mount_to_body(|| view! { <App/> });
}
