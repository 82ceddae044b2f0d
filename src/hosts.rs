//! Registry of file-hosting domains the transfer service understands.
//!
//! Every host is keyed by its canonical domain and carries the URL shapes
//! that belong to it. The table is compiled once on first use and never
//! changes afterwards.

use lazy_static::lazy_static;
use regex::Regex;

/// Hosts the transfer service can serve from its cache.
const CACHE_HOSTS: &[&str] = &[
    "wupfile.com",
    "rapidrar.com",
    "rapidgator.net",
    "filefactory.com",
    "mediafire.com",
    "turbobit.net",
    "hexload.com",
    "filesmonster.com",
    "1fichier.com",
    "filer.net",
    "uploadgig.com",
    "drop.download",
    "file.al",
    "hitfile.net",
    "filenext.com",
    "uploadboy.com",
    "katfile.com",
    "streamtape.com",
    "clicknupload.to",
    "ulozto.net",
    "alfafile.net",
    "vidoza.net",
    "isra.cloud",
    "mega.nz",
    "modsbase.com",
    "filestore.to",
    "ddownload.com",
    "filecat.net",
    "uploadrar.com",
    "usersdrive.com",
    "fastfile.cc",
];

/// Hosts the transfer service can stream directly.
const DIRECT_DOWNLOAD_HOSTS: &[&str] = &[
    "wupfile.com",
    "mediafire.com",
    "turbobit.net",
    "hexload.com",
    "filesmonster.com",
    "1fichier.com",
    "filer.net",
    "uploadgig.com",
    "drop.download",
    "file.al",
    "filenext.com",
    "uploadboy.com",
    "katfile.com",
    "streamtape.com",
    "ulozto.net",
    "alfafile.net",
    "vidoza.net",
    "isra.cloud",
    "mega.nz",
    "modsbase.com",
    "filestore.to",
    "ddownload.com",
    "filecat.net",
];

/// Hosts whose transfers must go through the queue.
const QUEUE_HOSTS: &[&str] = &["rapidgator.net", "hitfile.net", "clicknupload.to"];

/// Host id followed by the URL patterns that identify it. Order matters:
/// `classify` reports the first host with a matching pattern.
const HOST_PATTERNS: &[(&str, &[&str])] = &[
    ("wupfile.com", &[r"https?://[^/]*wupfile\.com/[a-z0-9]{12}.*"]),
    (
        "rapidrar.com",
        &[
            r"https?://[^/]*rapidrar\.com/.*",
            r"https?://[^/]*rapidrar\.cr/.*",
            r"https?://[^/]*rapidrar\.xyz/.*",
        ],
    ),
    (
        "rapidgator.net",
        &[r"https?://(www\.)?(rapidgator\.net|rg\.to|rapidgator\.host)/file/([a-zA-Z0-9]+)?(/.*)?"],
    ),
    (
        "filefactory.com",
        &[r"https?://[^/]*filefactory\.com/file/([^/]+)(/[^/]+)?(/[^/]+)?"],
    ),
    ("mediafire.com", &[r"https?://[^/]*mediafire\.com/.*"]),
    (
        "turbobit.net",
        &[
            r"([^/]+\.)?turbobit\.net/[a-zA-Z0-9]+/?.*\.html",
            r"https://turo-bit\.net/.*",
            r"https://turbo\.to/.*",
            r"https://turbobit\.cc/.*",
            r"https://turb\.to/.*",
            r"https://turb\.cc/.*",
            r"https://turbobif\.com/.*",
            r"https://trbbt\.net/.*",
        ],
    ),
    ("hexload.com", &[r"https?://[^/]*hexload\.com/[a-z0-9]{12}.*"]),
    (
        "filesmonster.com",
        &[
            r"https?://(www\.)?filesmonster\.com/download\.php\?id=.+",
            r"https?://(www\.)?filesmonster\.com/folders\.php\?fid=.+",
            r"https?://(www\.)?filesmonster\.com/dl/.*?/free/.*?/.+",
        ],
    ),
    ("1fichier.com", &[r"https?://1fichier\.com/?\?([a-zA-Z0-9]+)"]),
    ("filer.net", &[r"https?://[^/]*filer\.net/get/.*"]),
    (
        "uploadgig.com",
        &[r"https?://(www\.)?uploadgig\.com/file/download/([^/]+/?[^/]*)"],
    ),
    (
        "drop.download",
        &[
            r"https?://[^/]*drop\.download/[a-z0-9]{12}.*",
            r"https?://[^/]*dropapk\.com/[a-z0-9]{12}.*",
            r"https?://[^/]*dropapk\.to/[a-z0-9]{12}.*",
        ],
    ),
    ("file.al", &[r"https?://[^/]*file\.al/[a-z0-9]{12}.*"]),
    (
        "hitfile.net",
        &[
            r"https?://(www\.)?(hitfile\.net)/([a-zA-Z0-9]+)/?([^/<>]+\.html)?",
            r"https?://(www\.)?(hitfile\.net)/.*",
            r"https?://(www\.)?(hitf\.to)/([a-zA-Z0-9]+)/?([^/<>]+\.html)?",
            r"https?://(www\.)?(hitf\.to)/.*",
            r"https?://(www\.)?(hitf\.cc)/([a-zA-Z0-9]+)/?([^/<>]+\.html)?",
            r"https?://(www\.)?(hitf\.cc)/.*",
        ],
    ),
    ("filenext.com", &[r"https?://[^/]*filenext\.com/.*"]),
    (
        "uploadboy.com",
        &[
            r"https?://[^/]*uploadboy\.com/.*",
            r"https?://[^/]*uploadboy\.me/.*",
        ],
    ),
    ("katfile.com", &[r"https?://[^/]*katfile\.com/[a-z0-9]{12}.*"]),
    (
        "streamtape.com",
        &[
            r"https?://[^/]*streamtape\.com/v/.*",
            r"https?://[^/]*streamtape\.to/v/.*",
        ],
    ),
    (
        "clicknupload.to",
        &[
            r"https?://[^/]*clicknupload\.(org|co|cc|to|club|click|red|xyz|site|online|download|space)/(vidembed-)?[a-z0-9]{12}",
            r"https?://[^/]*clickndownload\.(click|cc|link)/(vidembed-)?[a-z0-9]{12}",
            r"https://clickn(?:download|upload)\.(?:[a-zA-Z]+\.?)+/[a-zA-Z0-9]+$",
        ],
    ),
    (
        "ulozto.net",
        &[
            r"https?://[^/]*ulozto\.net/.*",
            r"https?://[^/]*uloz\.to/.*",
            r"https?://[^/]*ulozto\.sk/.*",
            r"https?://[^/]*zachowajto\.pl/.*",
            r"https?://[^/]*ulozto\.cz/.*",
        ],
    ),
    (
        "alfafile.net",
        &[r"https?://(www\.)?alfafile\.net/file/([^/]+/?[^/]*)"],
    ),
    (
        "vidoza.net",
        &[
            r"https?://[^/]*vidoza\.net/.*",
            r"https?://[^/]*vidoza\.org/.*",
        ],
    ),
    (
        "isra.cloud",
        &[
            r"https?://[^/]*isra\.cloud/[a-z0-9]{12}.*",
            r"https?://[^/]*israbox\.ch/[a-z0-9]{12}.*",
            r"https?://[^/]*isrbx\.net/[a-z0-9]{12}.*",
            r"https?://[^/]*isrbx\.net/go/.*",
            r"https?://[^/]*israbox-music\.org/.*",
            r"https?://[^/]*isrbx\.me/.*",
        ],
    ),
    (
        "mega.nz",
        &[
            r"https?://[^/]*mega\.nz/#(.*)",
            r"https?://[^/]*mega\.co\.nz/#(.*)",
            r"https?://[^/]*mega\.nz/folder/\w+#\w+/file/\w+",
        ],
    ),
    (
        "modsbase.com",
        &[
            r"https?://(www\.)?modsbase\.com/([^/]+/?[^/]*)",
            r"https?://(www\.)?uploadfiles\.eu([^/]+/?[^/]*)",
        ],
    ),
    ("filestore.to", &[r"https?://[^/]*filestore\.to/\?d=[A-Z0-9]+"]),
    (
        "ddownload.com",
        &[
            r"https?://[^/]*ddownload\.com/[a-z0-9]{12}.*",
            r"https?://[^/]*ddl\.to/[a-z0-9]{12}.*",
        ],
    ),
    ("filecat.net", &[r"https?://[^/]*filecat\.net/f/.*"]),
    ("uploadrar.com", &[r"https?://[^/]*uploadrar\.com/[a-z0-9]{12}.*"]),
    ("usersdrive.com", &[r"https?://[^/]*usersdrive\.com/[a-z0-9]{12}.*"]),
    ("fastfile.cc", &[r"https?://[^/]*fastfile\.cc/[a-z0-9]{12}.*"]),
];

fn listed(table: &[&str], host: &str) -> bool {
    table.iter().any(|h| *h == host)
}

lazy_static! {
    static ref REGISTRY: HostRegistry = HostRegistry::builtin();
}

/// The process-wide registry.
pub fn registry() -> &'static HostRegistry {
    &REGISTRY
}

/// A hosting domain and the compiled patterns that recognise its URLs.
#[derive(Debug)]
pub struct HostPattern {
    pub id: &'static str,
    pub patterns: Vec<Regex>,
}

impl HostPattern {
    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(url))
    }
}

/// What the transfer service can do with links from one host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostCapabilities {
    pub cache: bool,
    pub direct_download: bool,
    pub queue: bool,
}

#[derive(Debug)]
pub struct HostRegistry {
    hosts: Vec<HostPattern>,
}

impl HostRegistry {
    fn builtin() -> Self {
        let hosts = HOST_PATTERNS
            .iter()
            .map(|(id, patterns)| HostPattern {
                id: *id,
                patterns: patterns
                    .iter()
                    .map(|p| Regex::new(p).expect("built-in host pattern must compile"))
                    .collect(),
            })
            .collect();

        Self { hosts }
    }

    /// Returns the id of the first host with a pattern matching `url`.
    pub fn classify(&self, url: &str) -> Option<&'static str> {
        self.hosts.iter().find(|h| h.matches(url)).map(|h| h.id)
    }

    pub fn capabilities(&self, host: &str) -> Option<HostCapabilities> {
        self.get(host)?;
        Some(HostCapabilities {
            cache: listed(CACHE_HOSTS, host),
            direct_download: listed(DIRECT_DOWNLOAD_HOSTS, host),
            queue: listed(QUEUE_HOSTS, host),
        })
    }

    pub fn get(&self, host: &str) -> Option<&HostPattern> {
        self.hosts.iter().find(|h| h.id == host)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &HostPattern> {
        self.hosts.iter()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One representative URL per host, in table order.
    const SAMPLES: &[(&str, &str)] = &[
        ("wupfile.com", "https://wupfile.com/abcdef123456/movie.mkv.html"),
        ("rapidrar.com", "https://rapidrar.com/abc123"),
        ("rapidgator.net", "https://rapidgator.net/file/abc123/movie.mkv.html"),
        ("filefactory.com", "https://www.filefactory.com/file/abc123/movie.mkv"),
        ("mediafire.com", "https://www.mediafire.com/file/xyz/movie.rar/file"),
        ("turbobit.net", "https://turbobit.net/abc123def.html"),
        ("hexload.com", "https://hexload.com/abcdef123456"),
        ("filesmonster.com", "https://filesmonster.com/download.php?id=abc"),
        ("1fichier.com", "https://1fichier.com/?abc123xyz"),
        ("filer.net", "https://filer.net/get/abc123"),
        ("uploadgig.com", "https://uploadgig.com/file/download/abc123/movie.rar"),
        ("drop.download", "https://drop.download/abcdef123456"),
        ("file.al", "https://file.al/abcdef123456/movie.rar"),
        ("hitfile.net", "https://hitfile.net/abc123"),
        ("filenext.com", "https://www.filenext.com/abc123/movie.rar"),
        ("uploadboy.com", "https://uploadboy.me/abc123"),
        ("katfile.com", "https://katfile.com/abcdef123456/movie.rar.html"),
        ("streamtape.com", "https://streamtape.com/v/abc123/movie.mp4"),
        ("clicknupload.to", "https://clicknupload.to/abcdef123456"),
        ("ulozto.net", "https://uloz.to/file/abc123/movie-mkv"),
        ("alfafile.net", "https://alfafile.net/file/abc123"),
        ("vidoza.net", "https://vidoza.net/abc123.html"),
        ("isra.cloud", "https://isra.cloud/abcdef123456"),
        ("mega.nz", "https://mega.nz/#!abc!key"),
        ("modsbase.com", "https://modsbase.com/abc123/movie.rar"),
        ("filestore.to", "https://filestore.to/?d=ABC123"),
        ("ddownload.com", "https://ddl.to/abcdef123456"),
        ("filecat.net", "https://filecat.net/f/abc123"),
        ("uploadrar.com", "https://uploadrar.com/abcdef123456"),
        ("usersdrive.com", "https://usersdrive.com/abcdef123456.html"),
        ("fastfile.cc", "https://fastfile.cc/abcdef123456"),
    ];

    #[test]
    fn every_host_has_a_sample() {
        assert_eq!(registry().len(), SAMPLES.len());
        for (host, (sample_host, _)) in registry().hosts().zip(SAMPLES) {
            assert_eq!(host.id, *sample_host);
        }
    }

    #[test]
    fn classify_recognises_each_host() {
        for (host, url) in SAMPLES {
            assert_eq!(registry().classify(url), Some(*host), "url: {}", url);
        }
    }

    #[test]
    fn classify_rejects_unknown_urls() {
        for url in [
            "https://example.com/file/abc",
            "https://sanet.st/blogs/movies/some_post.html",
            "not a url at all",
            "",
        ] {
            assert_eq!(registry().classify(url), None, "url: {}", url);
        }
    }

    #[test]
    fn classify_honours_url_shape_not_just_domain() {
        // katfile ids are exactly twelve lowercase alphanumerics
        assert_eq!(registry().classify("https://katfile.com/short"), None);
        assert_eq!(registry().classify("https://filer.net/about"), None);
    }

    #[test]
    fn mirror_domains_map_to_canonical_host() {
        assert_eq!(registry().classify("https://rg.to/file/abc"), Some("rapidgator.net"));
        assert_eq!(registry().classify("https://turb.cc/xyz"), Some("turbobit.net"));
        assert_eq!(
            registry().classify("https://mega.nz/folder/AbC123#key99/file/Xyz"),
            Some("mega.nz")
        );
    }

    #[test]
    fn capabilities_reflect_service_tables() {
        let rg = registry().capabilities("rapidgator.net").unwrap();
        assert!(rg.cache);
        assert!(!rg.direct_download);
        assert!(rg.queue);

        let mega = registry().capabilities("mega.nz").unwrap();
        assert_eq!(
            mega,
            HostCapabilities {
                cache: true,
                direct_download: true,
                queue: false
            }
        );

        assert!(registry().capabilities("example.com").is_none());
    }
}
