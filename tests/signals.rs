use std::collections::BTreeSet;

use modrepo::signals::{
    antifeature_rules, antifeatures, categories, category_rules, classify, normalize, Antifeature,
    Category,
};

fn listing(names: &[&str]) -> BTreeSet<String> {
    normalize(names.iter().copied())
}

#[test]
fn each_category_rule_fires_on_a_representative_name() {
    struct TestCase {
        file: &'static str,
        tag: Category,
    }

    let cases = vec![
        TestCase { file: "libzygisk.so", tag: Category::Zygisk },
        TestCase { file: "customize.sh", tag: Category::Script },
        TestCase { file: "system.prop", tag: Category::System },
        TestCase { file: "overlay.apk", tag: Category::Theme },
        TestCase { file: "Roboto-Regular.TTF", tag: Category::Font },
        TestCase { file: "ringtone.ogg", tag: Category::Audio },
        TestCase { file: "lsposed.dex", tag: Category::Framework },
        TestCase { file: "privacy.conf", tag: Category::Security },
        TestCase { file: "hosts", tag: Category::Network },
        TestCase { file: "governor.conf", tag: Category::Performance },
        TestCase { file: "backup.sh", tag: Category::Utility },
        TestCase { file: "pubg.cfg", tag: Category::Gaming },
        TestCase { file: "gcam.apk", tag: Category::Camera },
        TestCase { file: "magisk_module.log", tag: Category::Debug },
        TestCase { file: "player.jar", tag: Category::Multimedia },
        TestCase { file: "adblock.txt", tag: Category::AdBlock },
        TestCase { file: "i18n.json", tag: Category::Localization },
        TestCase { file: "keyboard.apk", tag: Category::Input },
    ];

    for case in cases {
        let rule = category_rules()
            .iter()
            .find(|rule| rule.tag == case.tag)
            .unwrap_or_else(|| panic!("no rule for {}", case.tag));
        assert!(
            rule.matches(&case.file.to_lowercase()),
            "{} should match {}",
            case.file,
            case.tag
        );
        assert!(
            categories(&listing(&[case.file])).contains(&case.tag),
            "{} should classify as {}",
            case.file,
            case.tag
        );
    }
}

#[test]
fn each_antifeature_rule_fires_on_a_representative_name() {
    struct TestCase {
        file: &'static str,
        tag: Antifeature,
    }

    let cases = vec![
        TestCase { file: "ads.txt", tag: Antifeature::Ads },
        TestCase { file: "analytics.jar", tag: Antifeature::Tracking },
        TestCase { file: "user_data.db", tag: Antifeature::Tracking },
        TestCase { file: "google-api.jar", tag: Antifeature::NonFreeNet },
        TestCase { file: "intro.mp3", tag: Antifeature::NonFreeAssets },
        TestCase { file: "nonfree_dep.txt", tag: Antifeature::NonFreeDep },
        TestCase { file: "premium_feature.so", tag: Antifeature::NonFreeAdd },
        TestCase { file: "nsfw.png", tag: Antifeature::Nsfw },
        TestCase { file: "CVE-2023-1234.txt", tag: Antifeature::KnownVuln },
    ];

    for case in cases {
        assert!(
            antifeature_rules()
                .iter()
                .any(|rule| rule.tag == case.tag && rule.matches(&case.file.to_lowercase())),
            "{} should match a {} rule",
            case.file,
            case.tag
        );
        assert!(
            antifeatures(&listing(&[case.file])).contains(&case.tag),
            "{} should flag {}",
            case.file,
            case.tag
        );
    }
}

#[test]
fn installer_script_names_must_match_exactly() {
    for file in ["service.sh.bak", "my_service.sh", "install.sh.orig"] {
        assert!(
            !categories(&listing(&[file])).contains(&Category::Script),
            "{file} is not an installer script"
        );
    }
}

#[test]
fn script_and_log_listing_has_no_antifeatures() {
    let result = classify(&listing(&["service.sh", "magisk_module.log"]));

    assert!(result.categories.contains(&Category::Script));
    assert!(result.categories.contains(&Category::Debug));
    assert!(result.antifeatures.is_empty());
}

#[test]
fn ad_blocker_listing_suppresses_advertising_tag() {
    let with_blocker = classify(&listing(&["remove_ads.sh", "ads.txt"]));
    assert!(!with_blocker.antifeatures.contains(&Antifeature::Ads));
    assert!(with_blocker.categories.contains(&Category::AdBlock));

    let without_blocker = classify(&listing(&["ads.txt"]));
    assert!(without_blocker.antifeatures.contains(&Antifeature::Ads));
}

#[test]
fn exclusion_only_suppresses_advertising() {
    let result = classify(&listing(&["adblock.txt", "ads.txt", "telemetry.jar"]));

    assert!(!result.antifeatures.contains(&Antifeature::Ads));
    assert!(result.antifeatures.contains(&Antifeature::Tracking));
}

#[test]
fn classification_ignores_enumeration_order_and_case() {
    let forward = classify(&normalize(["Service.sh", "hosts", "ADS.txt"]));
    let reverse = classify(&normalize(["ads.txt", "HOSTS", "service.sh"]));

    assert_eq!(forward, reverse);
}

#[test]
fn tags_are_reported_once() {
    let result = antifeatures(&listing(&["tracker.so", "analytics.so", "collect_data.sh"]));

    assert_eq!(result, [Antifeature::Tracking].into_iter().collect());
}

#[test]
fn empty_listing_classifies_to_nothing() {
    let result = classify(&BTreeSet::new());

    assert!(result.categories.is_empty());
    assert!(result.antifeatures.is_empty());
}
