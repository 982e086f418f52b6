//! Topic lag table
//!
//! Two columns (Topic, Current Lag), paged five rows at a time.

use std::ops::Range;

use leptos::*;

use super::primitives::{LagIndicator, SkeletonRow};
use crate::lag::LagRow;

/// Rows shown per page
pub const PAGE_SIZE: usize = 5;

/// Page arithmetic for a fixed row count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    total: usize,
    page_size: usize,
}

impl Pager {
    pub fn new(total: usize, page_size: usize) -> Self {
        Self {
            total,
            page_size: page_size.max(1),
        }
    }

    /// Number of pages; at least one
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size).max(1)
    }

    pub fn clamp(&self, page: usize) -> usize {
        page.min(self.page_count() - 1)
    }

    /// Row indices on `page`
    pub fn range(&self, page: usize) -> Range<usize> {
        let start = (self.clamp(page) * self.page_size).min(self.total);
        start..(start + self.page_size).min(self.total)
    }

    pub fn has_prev(&self, page: usize) -> bool {
        self.clamp(page) > 0
    }

    pub fn has_next(&self, page: usize) -> bool {
        self.clamp(page) + 1 < self.page_count()
    }

    /// `"6-10 of 12"`
    pub fn label(&self, page: usize) -> String {
        let range = self.range(page);
        if range.is_empty() {
            return format!("0 of {}", self.total);
        }
        format!("{}-{} of {}", range.start + 1, range.end, self.total)
    }
}

/// Lag table for loaded rows
#[component]
pub fn TopicTable(
    rows: Vec<LagRow>,
    #[prop(optional, default = PAGE_SIZE)] page_size: usize,
) -> impl IntoView {
    let pager = Pager::new(rows.len(), page_size);
    let rows = store_value(rows);
    let (page, set_page) = create_signal(0usize);

    let visible = move || rows.with_value(|r| r[pager.range(page.get())].to_vec());

    view! {
        <table role="table" aria-label="Topic lag">
            <TopicTableHead/>
            <tbody>
                <For
                    each=visible
                    key=|row| (row.group.clone(), row.topic.clone())
                    children=move |row| {
                        let value = row.lag_value();
                        view! {
                            <tr>
                                <td class="mono">{row.topic}</td>
                                <td><LagIndicator lag=row.lag value=value/></td>
                            </tr>
                        }
                    }
                />
            </tbody>
        </table>
        <Show when=move || { pager.page_count() > 1 }>
            <div class="pagination" role="navigation" aria-label="Topic pages">
                <button
                    class="btn btn-secondary"
                    disabled=move || !pager.has_prev(page.get())
                    on:click=move |_| set_page.update(|p| *p = pager.clamp(p.saturating_sub(1)))
                >
                    "Previous"
                </button>
                <span class="pagination-label" aria-live="polite">
                    {move || pager.label(page.get())}
                </span>
                <button
                    class="btn btn-secondary"
                    disabled=move || !pager.has_next(page.get())
                    on:click=move |_| set_page.update(|p| *p = pager.clamp(*p + 1))
                >
                    "Next"
                </button>
            </div>
        </Show>
    }
}

/// Table shell with skeleton rows while loading
#[component]
pub fn TopicTableSkeleton(#[prop(optional, default = 3)] rows: usize) -> impl IntoView {
    view! {
        <table role="table" aria-label="Topic lag" aria-busy="true">
            <TopicTableHead/>
            <tbody>
                {(0..rows).map(|_| view! { <SkeletonRow columns=2/> }).collect_view()}
            </tbody>
        </table>
    }
}

#[component]
fn TopicTableHead() -> impl IntoView {
    view! {
        <thead>
            <tr>
                <th scope="col">"Topic"</th>
                <th scope="col">"Current Lag"</th>
            </tr>
        </thead>
    }
}
