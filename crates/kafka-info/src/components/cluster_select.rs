//! Cluster picker

use leptos::*;

use crate::config::ClusterDescriptor;

/// `(index, label)` pairs in display order
pub fn cluster_options(clusters: &[ClusterDescriptor]) -> Vec<(usize, String)> {
    clusters
        .iter()
        .enumerate()
        .map(|(idx, cluster)| (idx, cluster.display_name(idx)))
        .collect()
}

/// Native select over the configured clusters
///
/// Emits the chosen index through `on_select`.
#[component]
pub fn ClusterSelect(
    clusters: Vec<ClusterDescriptor>,
    #[prop(into)] selected: Signal<usize>,
    on_select: Callback<usize>,
) -> impl IntoView {
    let options = cluster_options(&clusters);

    view! {
        <label class="cluster-select">
            <span class="info-label">"Cluster"</span>
            <select
                class="select"
                aria-label="Cluster"
                on:change=move |ev| {
                    if let Ok(idx) = event_target_value(&ev).parse::<usize>() {
                        on_select.call(idx);
                    }
                }
            >
                {options.into_iter().map(|(idx, label)| view! {
                    <option value=idx.to_string() prop:selected=move || selected.get() == idx>
                        {label}
                    </option>
                }).collect_view()}
            </select>
        </label>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_keep_order_and_fallback_labels() {
        let clusters = vec![
            ClusterDescriptor::new("prod", "prom-prod"),
            ClusterDescriptor::new("", "prom-stage"),
        ];
        assert_eq!(
            cluster_options(&clusters),
            vec![(0, "prod".to_string()), (1, "Cluster 2".to_string())]
        );
    }
}
