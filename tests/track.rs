use std::collections::BTreeSet;
use std::fs;
use std::io::{Cursor, Write};

use modrepo::contract::{
    ContentEntry, MockFetcher, MockSourcePlatform, RepositoryInfo, RepositoryLicense,
};
use modrepo::error::{FetchError, TrackError};
use modrepo::load_config::ModuleConfig;
use modrepo::signals::{Antifeature, Category};
use modrepo::track::TrackRecordBuilder;
use serde_json::{json, Value};
use tempfile::TempDir;

const DESCRIPTOR: &str = "https://upstream.test/demo/update.json";
const ZIP: &str = "https://upstream.test/demo/demo-2.0.zip";

fn module(url: &str) -> ModuleConfig {
    ModuleConfig {
        module_id: "demo".to_string(),
        url: url.to_string(),
        update_to: DESCRIPTOR.to_string(),
        homepage: "https://demo.test".to_string(),
        source: url.to_string(),
        support: String::new(),
        donate: String::new(),
        enable: true,
        verified: true,
    }
}

/// A stored (uncompressed) zip with one small file per name.
fn zip_of(names: &[&str]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for name in names {
            writer.start_file(*name, options).unwrap();
            writer.write_all(b"x").unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

fn fetcher_with(descriptor: Value, archive: Vec<u8>) -> MockFetcher {
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_get_json()
        .withf(|url| url == DESCRIPTOR)
        .returning(move |_| Ok(descriptor.clone()));
    fetcher
        .expect_get_bytes()
        .withf(|url| url == ZIP)
        .returning(move |_| Ok(archive.clone()));
    fetcher
}

fn licensed_platform(spdx: &str) -> MockSourcePlatform {
    let spdx = spdx.to_string();
    let mut platform = MockSourcePlatform::new();
    platform.expect_repository().returning(move |_, _| {
        Ok(RepositoryInfo {
            license: Some(RepositoryLicense {
                spdx_id: Some(spdx.clone()),
            }),
            updated_at: Some("2024-05-01T00:00:00Z".to_string()),
            ..Default::default()
        })
    });
    platform.expect_advisories().returning(|_, _| Ok(vec![]));
    platform.expect_contents().returning(|_, _| {
        Ok(vec![ContentEntry {
            name: "README.md".to_string(),
        }])
    });
    platform
}

#[tokio::test]
async fn builds_record_from_listing_platform_and_descriptor() {
    let fetcher = fetcher_with(
        json!({ "versions": [{ "version": "2.0", "versionCode": 20, "zipUrl": ZIP, "minMagisk": 20400 }] }),
        zip_of(&["common/service.sh", "magisk_module.log"]),
    );
    let platform = licensed_platform("MIT");

    let builder = TrackRecordBuilder::new(&fetcher, &platform);
    let record = builder
        .build(&module("https://github.com/owner/demo"))
        .await
        .expect("record should build");

    assert_eq!(record.id, "demo");
    assert!(record.enable);
    assert!(record.verified);
    assert_eq!(record.update_to, DESCRIPTOR);
    assert_eq!(record.license, "MIT");
    assert_eq!(
        record.readme,
        "https://raw.githubusercontent.com/owner/demo/main/README.md"
    );
    assert_eq!(record.version.as_deref(), Some("2.0"));
    assert_eq!(record.min_platform_version.as_deref(), Some("20400"));
    assert!(record.categories.contains(&Category::Script));
    assert!(record.categories.contains(&Category::Debug));
    assert!(record.antifeatures.is_empty());

    let serialized = serde_json::to_value(&record).unwrap();
    let object = serialized.as_object().unwrap();
    assert!(!object.contains_key("antifeatures"));
    assert_eq!(object["min_magisk"], "20400");
    assert!(object["categories"]
        .as_array()
        .unwrap()
        .contains(&json!("Script")));
}

#[tokio::test]
async fn antifeatures_union_platform_and_listing_signals() {
    let fetcher = fetcher_with(
        json!({ "version": "1.0", "versionCode": 1, "zipUrl": ZIP }),
        zip_of(&["tracker.dex", "module.prop"]),
    );
    let mut platform = MockSourcePlatform::new();
    platform.expect_repository().returning(|_, _| {
        Ok(RepositoryInfo {
            archived: true,
            license: None,
            ..Default::default()
        })
    });
    platform.expect_advisories().returning(|_, _| Ok(vec![]));
    platform.expect_contents().returning(|_, _| Ok(vec![]));

    let builder = TrackRecordBuilder::new(&fetcher, &platform);
    let record = builder
        .build(&module("https://github.com/owner/demo"))
        .await
        .unwrap();

    let want: BTreeSet<Antifeature> = [
        Antifeature::Tracking,
        Antifeature::NoSourceSince,
        Antifeature::UpstreamNonFree,
    ]
    .into_iter()
    .collect();
    assert_eq!(record.antifeatures, want);
    assert_eq!(record.license, "");
    assert_eq!(
        serde_json::to_value(&record).unwrap()["antifeatures"],
        json!(["tracking", "nosourcesince", "upstreamnonfree"])
    );
}

#[tokio::test]
async fn unreadable_archive_yields_no_file_signals() {
    let fetcher = fetcher_with(
        json!({ "version": "1.0", "versionCode": 1, "zipUrl": ZIP }),
        b"definitely not a zip".to_vec(),
    );
    // Unsupported host: the platform must not be queried at all.
    let platform = MockSourcePlatform::new();

    let builder = TrackRecordBuilder::new(&fetcher, &platform);
    let record = builder
        .build(&module("https://gitlab.com/owner/demo"))
        .await
        .unwrap();

    assert!(record.categories.is_empty());
    assert!(record.antifeatures.is_empty());
    assert_eq!(record.readme, "");
    assert_eq!(record.license, "");
    assert_eq!(record.version.as_deref(), Some("1.0"));
}

#[tokio::test]
async fn descriptor_failure_still_produces_a_record() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_get_json().returning(|url| {
        Err(FetchError::Status {
            url: url.to_string(),
            status: 500,
        })
    });
    fetcher.expect_get_bytes().never();
    let platform = licensed_platform("GPL-3.0");

    let builder = TrackRecordBuilder::new(&fetcher, &platform);
    let record = builder
        .build(&module("https://github.com/owner/demo"))
        .await
        .unwrap();

    assert_eq!(record.license, "GPL-3.0");
    assert!(record.version.is_none());
    assert!(record.min_platform_version.is_none());
    let serialized = serde_json::to_value(&record).unwrap();
    assert!(serialized.get("version").is_none());
    assert!(serialized.get("min_magisk").is_none());
}

#[tokio::test]
async fn malformed_configuration_is_rejected_before_any_call() {
    struct TestCase {
        name: &'static str,
        edit: fn(&mut ModuleConfig),
    }

    let cases = vec![
        TestCase {
            name: "blank module id",
            edit: |m| m.module_id = " ".to_string(),
        },
        TestCase {
            name: "module id escapes the modules directory",
            edit: |m| m.module_id = "../demo".to_string(),
        },
        TestCase {
            name: "blank url",
            edit: |m| m.url = String::new(),
        },
        TestCase {
            name: "blank update_to",
            edit: |m| m.update_to = String::new(),
        },
    ];

    for case in cases {
        let fetcher = MockFetcher::new();
        let platform = MockSourcePlatform::new();
        let builder = TrackRecordBuilder::new(&fetcher, &platform);

        let mut config = module("https://github.com/owner/demo");
        (case.edit)(&mut config);
        let err = builder.build(&config).await.unwrap_err();
        assert!(matches!(err, TrackError::Malformed(_)), "{}: got {err:?}", case.name);
    }
}

#[tokio::test]
async fn written_record_overwrites_track_file_with_four_space_indent() {
    let fetcher = fetcher_with(
        json!({ "version": "1.0", "versionCode": 1, "zipUrl": ZIP }),
        zip_of(&["service.sh"]),
    );
    let platform = licensed_platform("MIT");
    let builder = TrackRecordBuilder::new(&fetcher, &platform);
    let record = builder
        .build(&module("https://github.com/owner/demo"))
        .await
        .unwrap();

    let tmp = TempDir::new().unwrap();
    let stale = tmp.path().join("demo").join("track.json");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, r#"{"id":"demo","verified":false,"custom":"old"}"#).unwrap();

    let written = record.write(tmp.path()).unwrap();
    assert_eq!(written.path, stale);
    assert!(written.changed);
    assert!(!record.write(tmp.path()).unwrap().changed);

    let content = fs::read_to_string(&written.path).unwrap();
    assert!(content.contains("\n    \"id\": \"demo\""), "{content}");
    let written: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(written["verified"], true);
    assert!(written.get("custom").is_none());
    assert_eq!(written["categories"], json!(["Script"]));
}

#[tokio::test]
async fn blank_upstream_version_is_left_out_of_the_record() {
    let fetcher = fetcher_with(
        json!({ "version": " ", "versionCode": 1, "zipUrl": ZIP }),
        zip_of(&["service.sh"]),
    );
    let platform = licensed_platform("MIT");
    let builder = TrackRecordBuilder::new(&fetcher, &platform);
    let record = builder
        .build(&module("https://github.com/owner/demo"))
        .await
        .unwrap();

    assert_eq!(record.version, None);
    let serialized = serde_json::to_value(&record).unwrap();
    assert!(serialized.get("version").is_none(), "{serialized}");
}

#[tokio::test]
async fn latest_release_without_zip_url_yields_no_file_signals() {
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_get_json()
        .withf(|url| url == DESCRIPTOR)
        .returning(|_| Ok(json!({ "version": "2.0", "versionCode": 2 })));
    fetcher.expect_get_bytes().never();
    let platform = licensed_platform("MIT");
    let builder = TrackRecordBuilder::new(&fetcher, &platform);
    let record = builder
        .build(&module("https://github.com/owner/demo"))
        .await
        .unwrap();

    assert_eq!(record.version.as_deref(), Some("2.0"));
    assert!(record.categories.is_empty());
}
