use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use qrlink::analytics::{daily_clicks, recent_activity, summarize, top_links, MAX_DAYS};
use qrlink::model::{Activity, ClickEvent, Link, QrCode};

fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
}

fn link(id: &str, created_at: DateTime<Utc>, clicks_at: &[DateTime<Utc>]) -> Link {
    Link {
        id: id.to_string(),
        user_id: "user_1".to_string(),
        long_url: format!("https://example.com/{}", id),
        short_url: format!("http://localhost:8080/{}", id),
        short_code: id.to_string(),
        custom_alias: None,
        created_at,
        clicks: clicks_at.len() as u64,
        click_events: clicks_at.iter().copied().map(ClickEvent::at).collect(),
        active: true,
    }
}

fn qr(id: &str, created_at: DateTime<Utc>) -> QrCode {
    QrCode {
        id: id.to_string(),
        user_id: "user_1".to_string(),
        url: "https://example.com".to_string(),
        size: 300,
        format: "png".to_string(),
        image_data: "data:image/png;base64,AAAA".to_string(),
        created_at,
        downloads: 0,
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

#[test]
fn test_daily_clicks_window_and_order() {
    let today = today();
    let links = vec![
        link(
            "a",
            at(today, 1),
            &[
                at(today, 9),
                at(today, 10),
                at(today - Duration::days(6), 12),
                // Outside a 7 day window
                at(today - Duration::days(7), 12),
            ],
        ),
        link("b", at(today, 2), &[at(today - Duration::days(2), 8)]),
    ];

    let histogram = daily_clicks(&links, 7, today);

    let dates: Vec<NaiveDate> = histogram.keys().copied().collect();
    assert_eq!(dates.len(), 7);
    assert_eq!(dates[0], today - Duration::days(6));
    assert_eq!(dates[6], today);
    assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));

    assert_eq!(histogram[&today], 2);
    assert_eq!(histogram[&(today - Duration::days(2))], 1);
    assert_eq!(histogram[&(today - Duration::days(6))], 1);
    assert_eq!(histogram[&(today - Duration::days(1))], 0);
    assert_eq!(histogram.values().sum::<u64>(), 4);
}

#[test]
fn test_daily_clicks_serializes_as_date_keys() {
    let today = today();
    let histogram = daily_clicks(&[link("a", at(today, 1), &[at(today, 5)])], 2, today);

    let json = serde_json::to_value(&histogram).unwrap();
    assert_eq!(json["2024-03-10"], 1);
    assert_eq!(json["2024-03-09"], 0);
}

#[test]
fn test_top_links_sorted_and_limited() {
    let today = today();
    let clicks: Vec<DateTime<Utc>> = (0..10).map(|h| at(today, h)).collect();
    let links: Vec<Link> = (0..7)
        .map(|n| link(&format!("link_{}", n), at(today, 0), &clicks[..n]))
        .collect();

    let top = top_links(&links, 5);

    let counts: Vec<u64> = top.iter().map(|link| link.clicks).collect();
    assert_eq!(counts, vec![6, 5, 4, 3, 2]);
}

#[test]
fn test_recent_activity_merges_newest_first() {
    let today = today();
    let links = vec![link("old_link", at(today, 1), &[]), link("new_link", at(today, 4), &[])];
    let qr_codes = vec![qr("middle_qr", at(today, 3)), qr("oldest_qr", at(today, 0))];

    let feed = recent_activity(&links, &qr_codes, 10);
    let order: Vec<DateTime<Utc>> = feed.iter().map(Activity::created_at).collect();
    assert_eq!(
        order,
        vec![at(today, 4), at(today, 3), at(today, 1), at(today, 0)]
    );

    let limited = recent_activity(&links, &qr_codes, 2);
    assert_eq!(limited.len(), 2);

    let json = serde_json::to_value(&feed).unwrap();
    assert_eq!(json[0]["type"], "link");
    assert_eq!(json[0]["id"], "new_link");
    assert_eq!(json[1]["type"], "qr");
    assert_eq!(json[1]["id"], "middle_qr");
}

#[test]
fn test_summarize_totals() {
    let today = today();
    let links = vec![
        link("a", at(today, 1), &[at(today, 2), at(today, 3)]),
        link("b", at(today, 1), &[at(today - Duration::days(30), 3)]),
    ];
    let qr_codes = vec![qr("q", at(today, 5))];

    let analytics = summarize(&links, &qr_codes, 7, 10, today);

    assert_eq!(analytics.total_urls, 2);
    assert_eq!(analytics.total_qr_codes, 1);
    // Totals count every click, the histogram only the window
    assert_eq!(analytics.total_clicks, 3);
    assert_eq!(analytics.daily_clicks.values().sum::<u64>(), 2);
    assert_eq!(analytics.top_links[0].id, "a");
    assert_eq!(analytics.recent_activity.len(), 3);

    let json: Value = serde_json::to_value(&analytics).unwrap();
    assert_eq!(json["totalQRCodes"], 1);
    assert_eq!(json["totalUrls"], 2);
    assert!(json["dailyClicks"].is_object());
}

#[test]
fn test_daily_clicks_window_is_capped() {
    let today = today();
    let links = vec![link("a", at(today, 1), &[at(today, 2)])];

    let histogram = daily_clicks(&links, u32::MAX, today);
    assert_eq!(histogram.len(), MAX_DAYS as usize);
    assert_eq!(histogram.values().sum::<u64>(), 1);
    assert_eq!(
        histogram.keys().next().copied(),
        Some(today - Duration::days(i64::from(MAX_DAYS) - 1))
    );

    // The window stops at the earliest representable date
    let histogram = daily_clicks(&[], MAX_DAYS, NaiveDate::MIN);
    assert_eq!(histogram.len(), 1);
}
