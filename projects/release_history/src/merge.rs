//! Folds freshly fetched counters into a persisted snapshot.
//!
//! History is never rewritten: releases and assets are only ever added, and a
//! download series gains at most one entry per run, dated `day`.

use chrono::NaiveDate;

use crate::snapshot::models::{
    Asset, Release, Snapshot, Timestamp, TOTAL_ASSET_ID, TOTAL_ASSET_NAME,
};
use crate::source::FetchedRelease;

const METADATA_MARKERS: [&str; 2] = [".yml", ".blockmap"];

/// Update manifests and block maps ship next to installers but are not
/// downloads anyone asked for.
pub fn is_metadata_asset(name: &str) -> bool {
    METADATA_MARKERS.iter().any(|marker| name.contains(marker))
}

pub fn merge(mut snapshot: Snapshot, fetched: &[FetchedRelease], day: NaiveDate) -> Snapshot {
    for release in fetched {
        merge_release(&mut snapshot, release, day);
    }
    snapshot
}

pub fn merge_release(snapshot: &mut Snapshot, fetched: &FetchedRelease, day: NaiveDate) {
    let info = &fetched.info;
    let release = snapshot
        .releases
        .entry(info.id.to_string())
        .and_modify(|release| release.name = info.display_name().to_string())
        .or_insert_with(|| Release {
            assets: Default::default(),
            created_at: info.created_at.into(),
            name: info.display_name().to_string(),
        });
    // New assets take the release's stored creation time, in its stored form.
    let created_at = release.created_at.clone();

    let mut total: u64 = 0;
    for asset in fetched.assets.iter().filter(|a| !is_metadata_asset(&a.name)) {
        total += asset.download_count;
        observe(
            release,
            &asset.id.to_string(),
            &asset.name,
            asset.download_count,
            &created_at,
            day,
        );
    }

    observe(release, TOTAL_ASSET_ID, TOTAL_ASSET_NAME, total, &created_at, day);
}

fn observe(
    release: &mut Release,
    key: &str,
    name: &str,
    count: u64,
    created_at: &Timestamp,
    day: NaiveDate,
) {
    match release.assets.get_mut(key) {
        Some(existing) => {
            record_count(existing, day, count);
        }
        None => {
            release
                .assets
                .insert(key.to_string(), Asset::new(name, created_at.clone(), day, count));
        }
    }
}

/// Adds `day -> count` unless the latest entry is already `day` or already
/// holds `count`. Returns whether the series changed.
///
/// Only the latest entry is compared. A same-day change after the first
/// write is dropped.
pub fn record_count(asset: &mut Asset, day: NaiveDate, count: u64) -> bool {
    let should_insert = match asset.most_recent() {
        Some((latest, latest_count)) => latest != day && latest_count != count,
        None => true,
    };
    if should_insert {
        asset.downloads.insert(day, count);
    }
    should_insert
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::store::render_snapshot;
    use crate::source::{FetchedAsset, ReleaseInfo};
    use chrono::NaiveDateTime;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn created() -> NaiveDateTime {
        date(2024, 2, 1).and_hms_opt(8, 30, 0).unwrap()
    }

    fn asset(id: u64, name: &str, count: u64) -> FetchedAsset {
        FetchedAsset {
            id,
            name: name.to_string(),
            download_count: count,
        }
    }

    fn release(id: u64, title: &str, assets: Vec<FetchedAsset>) -> FetchedRelease {
        FetchedRelease {
            info: ReleaseInfo {
                id,
                created_at: created(),
                title: Some(title.to_string()),
                tag_name: format!("tag-{id}"),
            },
            assets,
        }
    }

    fn downloads(snapshot: &Snapshot, release: &str, asset: &str) -> Vec<(NaiveDate, u64)> {
        snapshot.releases[release].assets[asset]
            .downloads
            .iter()
            .map(|(d, c)| (*d, *c))
            .collect()
    }

    #[test]
    fn first_observation_creates_release_asset_and_total() {
        let day = date(2024, 3, 1);
        let merged = merge(
            Snapshot::default(),
            &[release(10, "v1", vec![asset(100, "app.zip", 3)])],
            day,
        );

        let expected = Snapshot {
            releases: BTreeMap::from([(
                "10".to_string(),
                Release {
                    assets: BTreeMap::from([
                        ("100".to_string(), Asset::new("app.zip", created(), day, 3)),
                        (
                            "total".to_string(),
                            Asset::new("Total downloads", created(), day, 3),
                        ),
                    ]),
                    created_at: created().into(),
                    name: "v1".to_string(),
                },
            )]),
        };
        assert_eq!(merged, expected);
    }

    #[test]
    fn total_sums_real_assets() {
        let day = date(2024, 3, 1);
        let merged = merge(
            Snapshot::default(),
            &[release(
                10,
                "v1",
                vec![asset(1, "a.exe", 10), asset(2, "b.dmg", 5)],
            )],
            day,
        );
        assert_eq!(downloads(&merged, "10", "total"), vec![(day, 15)]);
    }

    #[test]
    fn metadata_assets_are_ignored() {
        let day = date(2024, 3, 1);
        let merged = merge(
            Snapshot::default(),
            &[release(
                10,
                "v1",
                vec![
                    asset(1, "app-1.0.0.exe", 7),
                    asset(2, "update.yml", 400),
                    asset(3, "app-1.0.0.blockmap", 90),
                ],
            )],
            day,
        );

        let assets = &merged.releases["10"].assets;
        assert_eq!(
            assets.keys().cloned().collect::<Vec<_>>(),
            vec!["1".to_string(), "total".to_string()]
        );
        assert!(assets.values().all(|a| !is_metadata_asset(&a.name)));
        assert_eq!(downloads(&merged, "10", "total"), vec![(day, 7)]);
    }

    #[test]
    fn release_without_assets_still_gets_zero_total() {
        let day = date(2024, 3, 1);
        let merged = merge(Snapshot::default(), &[release(10, "v1", vec![])], day);
        assert_eq!(downloads(&merged, "10", "total"), vec![(day, 0)]);
    }

    #[test]
    fn merging_twice_on_same_day_is_idempotent() {
        let day = date(2024, 3, 1);
        let fetched = [release(10, "v1", vec![asset(1, "a.exe", 10)])];

        let once = merge(Snapshot::default(), &fetched, day);
        let twice = merge(once.clone(), &fetched, day);

        assert_eq!(twice, once);
        assert_eq!(
            render_snapshot(&twice).unwrap(),
            render_snapshot(&once).unwrap()
        );
    }

    #[test]
    fn same_day_change_after_first_write_is_dropped() {
        let day = date(2024, 3, 1);
        let first = merge(
            Snapshot::default(),
            &[release(10, "v1", vec![asset(1, "a.exe", 10)])],
            day,
        );
        let second = merge(
            first.clone(),
            &[release(10, "v1", vec![asset(1, "a.exe", 12)])],
            day,
        );

        assert_eq!(
            render_snapshot(&second).unwrap(),
            render_snapshot(&first).unwrap()
        );
    }

    #[test]
    fn changed_count_on_later_day_appends_entry() {
        let first_day = date(2024, 3, 1);
        let next_day = date(2024, 3, 4);
        let first = merge(
            Snapshot::default(),
            &[release(10, "v1", vec![asset(1, "a.exe", 10), asset(2, "b.exe", 1)])],
            first_day,
        );
        let second = merge(
            first,
            &[release(10, "v1", vec![asset(1, "a.exe", 14), asset(2, "b.exe", 1)])],
            next_day,
        );

        assert_eq!(
            downloads(&second, "10", "1"),
            vec![(first_day, 10), (next_day, 14)]
        );
        assert_eq!(downloads(&second, "10", "2"), vec![(first_day, 1)]);
        assert_eq!(
            downloads(&second, "10", "total"),
            vec![(first_day, 11), (next_day, 15)]
        );
    }

    #[test]
    fn unchanged_count_on_later_day_adds_nothing() {
        let first_day = date(2024, 3, 1);
        let fetched = [release(10, "v1", vec![asset(1, "a.exe", 10)])];
        let first = merge(Snapshot::default(), &fetched, first_day);
        let second = merge(first.clone(), &fetched, date(2024, 3, 9));
        assert_eq!(second, first);
    }

    #[test]
    fn only_latest_entry_is_compared() {
        let created = created();
        let mut existing = Asset::new("a.exe", created, date(2024, 1, 1), 5);
        existing.downloads.insert(date(2024, 1, 2), 8);

        // 5 appeared earlier in history, but the latest value is 8.
        assert!(record_count(&mut existing, date(2024, 1, 3), 5));
        assert_eq!(existing.most_recent(), Some((date(2024, 1, 3), 5)));
    }

    #[test]
    fn latest_is_chosen_by_date_not_insertion() {
        let mut existing = Asset::new("a.exe", created(), date(2024, 1, 20), 30);
        existing.downloads.insert(date(2023, 12, 31), 1);

        assert!(!record_count(&mut existing, date(2024, 1, 21), 30));
        assert_eq!(existing.downloads.len(), 2);
    }

    #[test]
    fn empty_series_accepts_the_day() {
        let mut existing = Asset::new("a.exe", created(), date(2024, 1, 1), 1);
        existing.downloads.clear();

        assert!(record_count(&mut existing, date(2024, 1, 5), 1));
        assert_eq!(existing.most_recent(), Some((date(2024, 1, 5), 1)));
    }

    #[test]
    fn seen_release_refreshes_name_but_keeps_creation_time() {
        let day = date(2024, 3, 1);
        let first = merge(Snapshot::default(), &[release(10, "v1", vec![])], day);

        let mut renamed = release(10, "", vec![]);
        renamed.info.created_at = date(2030, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        let second = merge(first, &[renamed], date(2024, 3, 2));

        let stored = &second.releases["10"];
        assert_eq!(stored.name, "tag-10");
        assert_eq!(stored.created_at, Timestamp::from(created()));
    }

    #[test]
    fn releases_missing_upstream_are_kept() {
        let day = date(2024, 3, 1);
        let first = merge(
            Snapshot::default(),
            &[
                release(10, "v1", vec![asset(1, "a.exe", 1)]),
                release(11, "v2", vec![asset(2, "b.exe", 2)]),
            ],
            day,
        );
        let second = merge(first, &[release(11, "v2", vec![])], date(2024, 3, 2));

        assert!(second.releases.contains_key("10"));
        assert!(second.releases["11"].assets.contains_key("2"));
        assert_eq!(
            downloads(&second, "11", "total"),
            vec![(day, 2), (date(2024, 3, 2), 0)]
        );
    }

    #[test]
    fn metadata_marker_matches_anywhere_in_name() {
        assert!(is_metadata_asset("latest-mac.yml"));
        assert!(is_metadata_asset("app.yml.sig"));
        assert!(is_metadata_asset("Setup 1.2.exe.blockmap"));
        assert!(!is_metadata_asset("app.yaml"));
        assert!(!is_metadata_asset("Setup 1.2.exe"));
    }
}
