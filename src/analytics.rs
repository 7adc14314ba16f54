//! Aggregates behind the dashboard
//!
//! Everything here is a pure function of a user's links and QR codes, so the
//! date window can be pinned in tests by passing `today` explicitly.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use crate::model::{Activity, Analytics, Link, QrCode};

pub const DEFAULT_DAYS: u32 = 7;
/// Longest histogram that will be computed; larger requests are clamped
pub const MAX_DAYS: u32 = 365;
pub const DEFAULT_RECENT_LIMIT: usize = 10;
pub const TOP_LINKS_LIMIT: usize = 5;

/// Builds the analytics view for one user
///
/// * `days` - number of calendar dates in the histogram, ending with `today`
/// * `recent_limit` - maximum length of the recent-activity feed
pub fn summarize(
    links: &[Link],
    qr_codes: &[QrCode],
    days: u32,
    recent_limit: usize,
    today: NaiveDate,
) -> Analytics {
    Analytics {
        total_urls: links.len() as u64,
        total_qr_codes: qr_codes.len() as u64,
        total_clicks: links.iter().map(|link| link.clicks).sum(),
        daily_clicks: daily_clicks(links, days, today),
        top_links: top_links(links, TOP_LINKS_LIMIT),
        recent_activity: recent_activity(links, qr_codes, recent_limit),
    }
}

/// Click histogram over the last `days` dates, oldest first
///
/// Every date of the window is present, even with zero clicks. Events outside
/// the window are ignored. `days` is capped at [`MAX_DAYS`].
pub fn daily_clicks(links: &[Link], days: u32, today: NaiveDate) -> BTreeMap<NaiveDate, u64> {
    let mut histogram: BTreeMap<NaiveDate, u64> = (0..u64::from(days.min(MAX_DAYS)))
        .map_while(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|date| (date, 0))
        .collect();

    for event in links.iter().flat_map(|link| link.click_events.iter()) {
        if let Some(count) = histogram.get_mut(&event.date) {
            *count += 1;
        }
    }

    histogram
}

/// Links with the most clicks first; ties keep creation order
pub fn top_links(links: &[Link], limit: usize) -> Vec<Link> {
    let mut sorted = links.to_vec();
    sorted.sort_by(|a, b| b.clicks.cmp(&a.clicks));
    sorted.truncate(limit);
    sorted
}

pub fn recent_activity(links: &[Link], qr_codes: &[QrCode], limit: usize) -> Vec<Activity> {
    let mut feed: Vec<Activity> = links
        .iter()
        .cloned()
        .map(Activity::Link)
        .chain(qr_codes.iter().cloned().map(Activity::Qr))
        .collect();

    feed.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    feed.truncate(limit);
    feed
}
