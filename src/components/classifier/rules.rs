//! Rule tables for the stub classifier.
//!
//! These are data, not logic: the matching order and confidences live in
//! the component, and the tables here are the swappable part that a
//! database- or model-backed classifier will eventually replace.

pub const ACADEMIC_DOMAINS: &[&str] = &[
    // Educational TLDs
    ".edu",
    ".ac.uk",
    ".ac.jp",
    ".edu.au",
    ".edu.sg",
    // Research
    "scholar.google",
    "researchgate.net",
    "academia.edu",
    "arxiv.org",
    "pubmed.ncbi",
    "jstor.org",
    "ieee.org",
    // Learning platforms
    "coursera.org",
    "edx.org",
    "khanacademy.org",
    "udemy.com",
    "udacity.com",
    "brilliant.org",
    "duolingo.com",
    // Reference
    "wikipedia.org",
    "wikimedia.org",
    "britannica.com",
    // University systems
    "canvas",
    "blackboard",
    "moodle",
];

pub const PRODUCTIVITY_DOMAINS: &[&str] = &[
    // Development
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "stackoverflow.com",
    "stackexchange.com",
    // Documentation
    "docs.google.com",
    "notion.so",
    "confluence",
    // Cloud/Office
    "drive.google.com",
    "office.com",
    "dropbox.com",
    // Online IDEs
    "replit.com",
    "codepen.io",
    "codesandbox.io",
];

pub const NON_ACADEMIC_DOMAINS: &[&str] = &[
    // Social media
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "tiktok.com",
    "snapchat.com",
    "reddit.com",
    // Video entertainment
    "netflix.com",
    "hulu.com",
    "disneyplus.com",
    "twitch.tv",
    "primevideo.com",
    // Gaming
    "steampowered.com",
    "epicgames.com",
    "roblox.com",
    // Shopping
    "amazon.com",
    "ebay.com",
    "aliexpress.com",
];

pub const EDUCATIONAL_TLDS: &[&str] = &[".edu", ".ac.uk", ".edu.au"];

pub const ACADEMIC_TITLE_KEYWORDS: &[&str] =
    &["lecture", "course", "study", "research", "thesis", "paper"];

pub const YOUTUBE_EDU_KEYWORDS: &[&str] = &[
    "tutorial",
    "lecture",
    "course",
    "learn",
    "explained",
    "how to",
    "education",
    "university",
    "professor",
];

pub const YOUTUBE_ENTERTAINMENT_KEYWORDS: &[&str] =
    &["gameplay", "funny", "prank", "vlog", "reaction"];

// Desktop app rule sets, matched against the normalized app name.

pub const ACADEMIC_APPS: &[&str] = &[
    "anki",
    "zotero",
    "mendeley",
    "obsidian",
    "notability",
    "goodnotes",
    "kindle",
    "matlab",
    "rstudio",
    "mathematica",
    "texshop",
];

pub const PRODUCTIVITY_APPS: &[&str] = &[
    "code",
    "visual studio",
    "intellij",
    "pycharm",
    "xcode",
    "terminal",
    "iterm",
    "slack",
    "notion",
    "word",
    "excel",
    "powerpoint",
    "figma",
    "postman",
];

pub const NON_ACADEMIC_APPS: &[&str] = &[
    "steam",
    "epic games",
    "discord",
    "spotify",
    "netflix",
    "league of legends",
    "minecraft",
    "battle.net",
    "twitch",
    "vlc",
];

pub const NEUTRAL_APPS: &[&str] = &[
    "finder",
    "explorer",
    "system preferences",
    "system settings",
    "calculator",
    "calendar",
    "mail",
    "notes",
    "clock",
];

pub const ACADEMIC_WINDOW_KEYWORDS: &[&str] = &[
    "lecture",
    "homework",
    "assignment",
    "exam",
    "thesis",
    "course",
    "textbook",
];

pub const PRODUCTIVITY_WINDOW_KEYWORDS: &[&str] =
    &["project", "meeting", "document", "report", "draft", "spreadsheet"];

pub const NON_ACADEMIC_WINDOW_KEYWORDS: &[&str] =
    &["game", "music", "video", "stream", "chat", "shopping"];
