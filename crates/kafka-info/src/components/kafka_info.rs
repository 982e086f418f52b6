//! Kafka Info card
//!
//! Fetches consumer lag for the entity's groups from the selected cluster
//! and renders the topic table. The card owns its [`WidgetState`]; nothing is
//! shared between card instances.

use std::future::Future;
use std::rc::Rc;

use leptos::*;
use tracing::{debug, warn};
use wasm_bindgen_futures::spawn_local;

use super::cluster_select::ClusterSelect;
use super::primitives::{Badge, BadgeVariant, EmptyState, ErrorState, TableCard};
use super::topic_table::{TopicTable, TopicTableSkeleton};
use crate::api::GlooTransport;
use crate::config::{cluster_attribute, ClusterAttribute, ClusterDescriptor, KafkaInfoConfig};
use crate::entity::{ConsumerGroupSet, Entity};
use crate::error::{FetchError, FetchResult};
use crate::lag::{source_for, FilteredResult, LagSource};
use crate::state::{FetchTicket, Phase, WidgetState};

/// Runs fetches and feeds their outcome back into the card state
#[derive(Clone)]
struct LagFetcher {
    source: Rc<dyn LagSource>,
    clusters: Rc<[ClusterDescriptor]>,
    groups: Rc<ConsumerGroupSet>,
    state: RwSignal<WidgetState>,
}

impl LagFetcher {
    fn run(&self, ticket: FetchTicket) {
        spawn_local(self.fetch_and_resolve(ticket));
    }

    /// Fetch for `ticket` and apply the outcome unless a newer fetch began
    fn fetch_and_resolve(&self, ticket: FetchTicket) -> impl Future<Output = ()> + 'static {
        let this = self.clone();
        async move {
            let outcome =
                fetch_for_ticket(this.source.as_ref(), &this.clusters, &this.groups, ticket).await;
            if let Err(err) = &outcome {
                warn!(error = %err, "consumer lag fetch failed");
            }

            let mut applied = false;
            this.state.update(|s| applied = s.resolve(ticket, outcome));
            if !applied {
                debug!(
                    cluster_index = ticket.cluster_index(),
                    "discarding stale lag response"
                );
            }
        }
    }

    fn begin_select(&self, index: usize) -> Option<FetchTicket> {
        let mut ticket = None;
        self.state.update(|s| ticket = s.select_cluster(index));
        ticket
    }

    fn begin_retry(&self) -> Option<FetchTicket> {
        let mut ticket = None;
        self.state.update(|s| ticket = Some(s.retry()));
        ticket
    }

    fn select(&self, index: usize) {
        if let Some(ticket) = self.begin_select(index) {
            self.run(ticket);
        }
    }

    fn retry(&self) {
        if let Some(ticket) = self.begin_retry() {
            self.run(ticket);
        }
    }
}

/// Fetch lag from the cluster a ticket was issued for
///
/// A ticket pointing past the configured clusters, or at a cluster without a
/// proxy, fails as `Unspecified` without issuing a request.
async fn fetch_for_ticket(
    source: &dyn LagSource,
    clusters: &[ClusterDescriptor],
    groups: &ConsumerGroupSet,
    ticket: FetchTicket,
) -> FetchResult<FilteredResult> {
    let index = ticket.cluster_index();
    let Some(cluster) = clusters.get(index) else {
        return Err(FetchError::Unspecified(
            "no Kafka cluster configured".to_string(),
        ));
    };
    if cluster_attribute(clusters, index, ClusterAttribute::Proxy).is_empty() {
        return Err(FetchError::Unspecified(format!(
            "{} has no proxy configured",
            cluster.display_name(index)
        )));
    }
    debug!(
        cluster = cluster_attribute(clusters, index, ClusterAttribute::Name),
        groups = %groups,
        "fetching consumer lag"
    );
    source.fetch_lag(cluster, groups).await
}

/// Consumer lag card for one entity
///
/// `source` defaults to the format selected in `config`, fetched through
/// gloo-net with the configured timeout.
#[component]
pub fn KafkaInfoCard(
    config: KafkaInfoConfig,
    entity: Entity,
    #[prop(optional)] source: Option<Rc<dyn LagSource>>,
) -> impl IntoView {
    let source =
        source.unwrap_or_else(|| source_for(&config, GlooTransport::new(config.timeout())));
    let clusters: Rc<[ClusterDescriptor]> = config.clusters().into();
    let groups = Rc::new(entity.consumer_groups());

    let mut initial = WidgetState::new(clusters.len());
    let first = initial.begin_fetch();
    let state = create_rw_signal(initial);

    let fetcher = LagFetcher {
        source,
        clusters: clusters.clone(),
        groups: groups.clone(),
        state,
    };
    fetcher.run(first);

    let on_select = {
        let fetcher = fetcher.clone();
        Callback::new(move |index: usize| fetcher.select(index))
    };
    let on_retry = Callback::new(move |_: ()| fetcher.retry());

    let action = if clusters.len() > 1 {
        view! {
            <ClusterSelect
                clusters=clusters.to_vec()
                selected=Signal::derive(move || state.with(|s| s.selected_cluster()))
                on_select=on_select
            />
        }
        .into_view()
    } else {
        ().into_view()
    };

    let badge_text = if groups.is_empty() {
        entity.metadata.name.clone()
    } else {
        groups.to_string()
    };
    let badge = view! { <Badge text=badge_text variant=BadgeVariant::Accent/> }.into_view();

    let body = move || match state.with(|s| s.phase().clone()) {
        Phase::Loading => view! { <TopicTableSkeleton/> }.into_view(),
        Phase::Failed(err) => view! {
            <ErrorState title=err.title() message=err.to_string() retry=on_retry/>
        }
        .into_view(),
        // Zero rows render as the empty panel instead of a headed empty table
        Phase::Loaded(result) if result.is_empty() => view! {
            <EmptyState
                title="No consumer groups"
                description="Annotate this entity with kafka-info/consumer-groups to show consumer lag"
            />
        }
        .into_view(),
        Phase::Loaded(result) => view! { <TopicTable rows=result.rows().to_vec()/> }.into_view(),
    };

    view! {
        <TableCard title="Kafka Info" action=action badge=badge>
            <div class="card-body" aria-live="polite">
                {body}
            </div>
        </TableCard>
    }
}
