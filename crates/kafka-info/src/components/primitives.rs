//! Small presentational pieces used by the card
//!
//! Skeleton rows stand in for the table while a fetch is running, the
//! error and empty panels replace it when there is nothing to show.

use leptos::*;

// ============================================================================
// Placeholders
// ============================================================================

/// Shimmering bar sized by CSS length
#[component]
pub fn Skeleton(
    #[prop(optional, default = "100%")] width: &'static str,
    #[prop(optional, default = "0.875rem")] height: &'static str,
) -> impl IntoView {
    view! {
        <span class="placeholder" style:width=width style:height=height aria-hidden="true"></span>
    }
}

/// One table row of placeholders
#[component]
pub fn SkeletonRow(#[prop(optional, default = 2)] columns: usize) -> impl IntoView {
    let cells = (0..columns)
        .map(|col| {
            // Narrower value column reads as a number
            let width = if col + 1 == columns { "40%" } else { "70%" };
            view! { <td><Skeleton width=width/></td> }
        })
        .collect_view();

    view! { <tr class="placeholder-row" aria-hidden="true">{cells}</tr> }
}

// ============================================================================
// Panels
// ============================================================================

/// Inline failure panel, optionally with a retry action
#[component]
pub fn ErrorState(
    message: String,
    #[prop(optional)] title: Option<&'static str>,
    #[prop(optional)] retry: Option<Callback<()>>,
) -> impl IntoView {
    view! {
        <div class="panel panel-error" role="alert">
            <strong class="panel-title">{title.unwrap_or("Error")}</strong>
            <p class="panel-text">{message}</p>
            {retry.map(|retry| view! {
                <button type="button" class="btn btn-small" on:click=move |_| retry.call(())>
                    "Try Again"
                </button>
            })}
        </div>
    }
}

/// Neutral panel for an empty table
#[component]
pub fn EmptyState(
    title: &'static str,
    #[prop(optional)] description: Option<&'static str>,
) -> impl IntoView {
    view! {
        <div class="panel panel-empty" role="status">
            <strong class="panel-title">{title}</strong>
            {description.map(|text| view! { <p class="panel-text">{text}</p> })}
        </div>
    }
}

// ============================================================================
// Labels
// ============================================================================

/// Badge colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BadgeVariant {
    #[default]
    Neutral,
    Accent,
}

impl BadgeVariant {
    pub fn class(self) -> &'static str {
        match self {
            BadgeVariant::Neutral => "chip",
            BadgeVariant::Accent => "chip chip-accent",
        }
    }
}

/// Short label next to the card title
#[component]
pub fn Badge(
    #[prop(into)] text: String,
    #[prop(optional)] variant: BadgeVariant,
) -> impl IntoView {
    view! { <span class=variant.class() title=text.clone()>{text}</span> }
}

/// Lag value with bar visualization
///
/// `lag` is displayed exactly as reported. The bar is drawn from `value`
/// when it is finite and non-negative.
#[component]
pub fn LagIndicator(lag: String, value: Option<f64>) -> impl IntoView {
    let numeric = value.filter(|v| v.is_finite() && *v >= 0.0);
    let title = numeric.map(|v| format_number(v as u64));
    let value_now = numeric.map(|v| v.to_string());

    view! {
        <div class="lag-indicator" role="meter" aria-valuenow=value_now aria-valuemin=0 aria-valuemax=10000>
            <span class="mono" title=title>{lag}</span>
            {numeric.map(|v| {
                let width = format!("{}%", v.min(10_000.0) / 100.0);
                view! {
                    <span class="lag-track" aria-hidden="true">
                        <span class=format!("lag-fill {}", lag_class(v as u64)) style:width=width></span>
                    </span>
                }
            })}
        </div>
    }
}

/// Card frame with a title row
///
/// `badge` sits next to the title, `action` at the right edge of the row.
#[component]
pub fn TableCard(
    title: &'static str,
    children: Children,
    #[prop(optional)] action: Option<View>,
    #[prop(optional)] badge: Option<View>,
) -> impl IntoView {
    view! {
        <section class="card" aria-label=title>
            <header class="card-header">
                <h2 class="card-title">{title}</h2>
                {badge}
                <div class="card-action">{action}</div>
            </header>
            {children()}
        </section>
    }
}

/// Compact count for tooltips: `12.5K`, `3.0M`
pub fn format_number(num: u64) -> String {
    match num {
        n if n >= 1_000_000 => format!("{:.1}M", n as f64 / 1e6),
        n if n >= 1_000 => format!("{:.1}K", n as f64 / 1e3),
        n => n.to_string(),
    }
}

/// Severity class for the lag bar
pub fn lag_class(lag: u64) -> &'static str {
    match lag {
        0..=999 => "good",
        1_000..=9_999 => "warning",
        _ => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(12_500), "12.5K");
        assert_eq!(format_number(3_000_000), "3.0M");
    }

    #[test]
    fn test_lag_class() {
        assert_eq!(lag_class(0), "good");
        assert_eq!(lag_class(999), "good");
        assert_eq!(lag_class(1_000), "warning");
        assert_eq!(lag_class(50_000), "error");
    }

    #[test]
    fn test_badge_classes() {
        assert_eq!(BadgeVariant::default().class(), "chip");
        assert_eq!(BadgeVariant::Accent.class(), "chip chip-accent");
    }
}
