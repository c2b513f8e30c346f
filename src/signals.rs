//! File-name signals: derives module categories and antifeatures from the lower-cased file
//! names found in a package archive.
//!
//! Classification is a data-driven rule table. Each [`Rule`] pairs one tag with a list of
//! case-insensitive patterns and fires when any file name matches any of its patterns.
//! Rules are independent; a tag is reported once however many rules or files trigger it.
//!
//! The only cross-rule interaction is the ad-blocker exclusion: when any file name looks like
//! an ad-removal module, the advertising rule is suppressed for the whole listing.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Zygisk,
    Script,
    System,
    Theme,
    Font,
    Audio,
    Framework,
    Security,
    Network,
    Performance,
    Utility,
    Gaming,
    Camera,
    Debug,
    Multimedia,
    AdBlock,
    Localization,
    Input,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Zygisk => "Zygisk",
            Category::Script => "Script",
            Category::System => "System",
            Category::Theme => "Theme",
            Category::Font => "Font",
            Category::Audio => "Audio",
            Category::Framework => "Framework",
            Category::Security => "Security",
            Category::Network => "Network",
            Category::Performance => "Performance",
            Category::Utility => "Utility",
            Category::Gaming => "Gaming",
            Category::Camera => "Camera",
            Category::Debug => "Debug",
            Category::Multimedia => "Multimedia",
            Category::AdBlock => "AdBlock",
            Category::Localization => "Localization",
            Category::Input => "Input",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Antifeature vocabulary shared with the repository's consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Antifeature {
    Ads,
    Tracking,
    NonFreeNet,
    NonFreeAssets,
    NonFreeDep,
    NonFreeAdd,
    Nsfw,
    KnownVuln,
    NoSourceSince,
    UpstreamNonFree,
}

impl Antifeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Antifeature::Ads => "ads",
            Antifeature::Tracking => "tracking",
            Antifeature::NonFreeNet => "nonfreenet",
            Antifeature::NonFreeAssets => "nonfreeassets",
            Antifeature::NonFreeDep => "nonfreedep",
            Antifeature::NonFreeAdd => "nonfreeadd",
            Antifeature::Nsfw => "nsfw",
            Antifeature::KnownVuln => "knownvuln",
            Antifeature::NoSourceSince => "nosourcesince",
            Antifeature::UpstreamNonFree => "upstreamnonfree",
        }
    }
}

impl fmt::Display for Antifeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the rule table.
#[derive(Debug)]
pub struct Rule<T> {
    pub tag: T,
    patterns: Vec<Regex>,
}

impl<T: Copy> Rule<T> {
    fn new(tag: T, patterns: &[&str]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .unwrap_or_else(|e| panic!("invalid built-in pattern {p:?}: {e}"))
            })
            .collect();
        Self { tag, patterns }
    }

    /// True when `name` matches any pattern of this rule.
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }

    /// True when any file name matches.
    pub fn fires<'a, I>(&self, files: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        files.into_iter().any(|name| self.matches(name))
    }
}

static CATEGORY_RULES: LazyLock<Vec<Rule<Category>>> = LazyLock::new(|| {
    vec![
        Rule::new(Category::Zygisk, &["zygisk", "zygote", "riru"]),
        Rule::new(
            Category::Script,
            &[
                r"^service\.sh$",
                r"^post-fs-data\.sh$",
                r"^customize\.sh$",
                r"^install\.sh$",
            ],
        ),
        Rule::new(
            Category::System,
            &["system", r"system\.prop", "vendor", "product", "boot", "recovery"],
        ),
        Rule::new(
            Category::Theme,
            &[
                "theme",
                "style",
                "overlay",
                "skin",
                "color",
                "appearance",
                "icon",
                "ui",
                "interface",
            ],
        ),
        Rule::new(
            Category::Font,
            &["font", "typeface", r"\.ttf$", r"\.otf$", r"\.woff2?$", "emoji"],
        ),
        Rule::new(
            Category::Audio,
            &[
                "audio",
                "sound",
                "music",
                "ringtone",
                r"\.wav$",
                r"\.mp3$",
                r"\.m4a$",
                r"\.ogg$",
                "dolby",
                "equalizer",
                "speaker",
            ],
        ),
        Rule::new(
            Category::Framework,
            &[
                "framework",
                "xposed",
                "lsposed",
                "edxposed",
                "taichi",
                "hook",
                "inject",
            ],
        ),
        Rule::new(
            Category::Security,
            &[
                "security",
                "privacy",
                "protect",
                "safe",
                "crypto",
                "permission",
                "lock",
                "hide",
                "mask",
            ],
        ),
        Rule::new(
            Category::Network,
            &[
                "network", "wifi", "proxy", "vpn", "dns", "hosts", "firewall", "internet",
                "data", "5g", "4g",
            ],
        ),
        Rule::new(
            Category::Performance,
            &[
                "performance",
                "boost",
                "tweak",
                "optimize",
                "governor",
                "kernel",
                "cpu",
                "gpu",
                "ram",
                "memory",
                "battery",
            ],
        ),
        Rule::new(
            Category::Utility,
            &[
                "util", "tool", "helper", "manager", "settings?", "config", "backup", "restore",
                "clean",
            ],
        ),
        Rule::new(
            Category::Gaming,
            &["game", "gaming", "fps", "pubg", "codm", "unity", "unreal"],
        ),
        Rule::new(
            Category::Camera,
            &["camera", "photo", "video", "gcam", "lens"],
        ),
        Rule::new(
            Category::Debug,
            &["debug", "log", "trace", "test", "monitor", "analyze"],
        ),
        Rule::new(
            Category::Multimedia,
            &["media", "player", "codec", "stream", "record"],
        ),
        Rule::new(Category::AdBlock, AD_BLOCK_PATTERNS),
        Rule::new(
            Category::Localization,
            &[
                "i18n",
                "l10n",
                "locali[sz]e",
                "translate",
                "language",
                "国际化",
                "本地化",
            ],
        ),
        Rule::new(
            Category::Input,
            &["input[-_]?method", "keyboard", "ime", "输入法"],
        ),
    ]
});

/// Names that mark an ad-removal module.
const AD_BLOCK_PATTERNS: &[&str] = &[
    "去广告",
    r"ad[-_]?block",
    r"block[-_]?ads?",
    r"no[-_]?ads?",
    r"remove[-_]?ads?",
];

/// Ad-blocker detection that suppresses the advertising rule.
static AD_EXCLUSION: LazyLock<Rule<Category>> =
    LazyLock::new(|| Rule::new(Category::AdBlock, AD_BLOCK_PATTERNS));

static ANTIFEATURE_RULES: LazyLock<Vec<Rule<Antifeature>>> = LazyLock::new(|| {
    vec![
        Rule::new(
            Antifeature::Ads,
            &[r"\bads?\b", r"\badvertis(ing|ement)\b", "广告"],
        ),
        Rule::new(
            Antifeature::Tracking,
            &[
                r"\btrack(er|ing)?\b",
                r"\banalytics?\b",
                r"\bstatistics?\b",
                r"\btelemetry\b",
            ],
        ),
        Rule::new(
            Antifeature::NonFreeNet,
            &[
                r"\b(google|facebook|amazon|azure|aws)[-_]?(api|sdk|service)\b",
                r"\bcloud[-_]?(api|service)\b",
            ],
        ),
        Rule::new(
            Antifeature::NonFreeAssets,
            &[
                r"\.mp3", r"\.aac", r"\.wma", r"\.m4p", r"\.m4v", "proprietary", "nonfree",
            ],
        ),
        Rule::new(
            Antifeature::NonFreeDep,
            &[r"nonfree[-_]?dep", r"proprietary[-_]?dep"],
        ),
        Rule::new(
            Antifeature::NonFreeAdd,
            &[r"nonfree[-_]?addon", r"premium[-_]?feature"],
        ),
        Rule::new(Antifeature::Nsfw, &[r"\bnsfw\b", r"\badult\b", r"\bmature\b"]),
        // User-data collection reports as tracking.
        Rule::new(
            Antifeature::Tracking,
            &[
                r"collect[-_]?data",
                r"user[-_]?data",
                r"data[-_]?collection",
                "收集数据",
            ],
        ),
        Rule::new(
            Antifeature::KnownVuln,
            &[
                r"cve-\d+",
                "vulnerability",
                "exploit",
                r"security[-_]?issue",
                "漏洞",
            ],
        ),
    ]
});

pub fn category_rules() -> &'static [Rule<Category>] {
    &CATEGORY_RULES
}

pub fn antifeature_rules() -> &'static [Rule<Antifeature>] {
    &ANTIFEATURE_RULES
}

/// Tags derived from one file listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub categories: BTreeSet<Category>,
    pub antifeatures: BTreeSet<Antifeature>,
}

/// Lower-cases file names the way listings are compared.
pub fn normalize<I, S>(names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().to_lowercase())
        .collect()
}

pub fn classify(files: &BTreeSet<String>) -> Classification {
    Classification {
        categories: categories(files),
        antifeatures: antifeatures(files),
    }
}

pub fn categories(files: &BTreeSet<String>) -> BTreeSet<Category> {
    category_rules()
        .iter()
        .filter(|rule| rule.fires(files.iter().map(String::as_str)))
        .map(|rule| rule.tag)
        .collect()
}

/// The antifeature half of [`classify`], also applied to repository listings.
pub fn antifeatures(files: &BTreeSet<String>) -> BTreeSet<Antifeature> {
    let is_ad_blocker = AD_EXCLUSION.fires(files.iter().map(String::as_str));
    antifeature_rules()
        .iter()
        .filter(|rule| !(is_ad_blocker && rule.tag == Antifeature::Ads))
        .filter(|rule| rule.fires(files.iter().map(String::as_str)))
        .map(|rule| rule.tag)
        .collect()
}
