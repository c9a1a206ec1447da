//! Download-vs-inline planning with resumable transfer semantics
//!
//! The planner runs in two halves around each request. Before sending it
//! derives the default local filename, checks the disk for a resumable
//! partial, and (for forced downloads) probes with HEAD so a server-supplied
//! filename can be resumed too. After the response arrives it decides whether
//! the body goes to a file or the terminal, and under what name.

use std::path::{Path, PathBuf};

use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method};
use url::Url;

use crate::cli::args::{Args, DownloadMode};
use crate::fs;
use crate::request::template::RequestTemplate;

/// Bodies at or below this many bytes count as inline-displayable.
pub const INLINE_THRESHOLD: u64 = 2048;

/// Where a nonzero resume offset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetSource {
    #[default]
    None,
    /// A nonzero local file under the default name.
    LocalFile,
    /// A partial file under the HEAD probe's header-derived name.
    Probe,
}

/// The post-response verdict, consumed immediately by the sink.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferDecision {
    pub to_file: bool,
    pub filename: Option<PathBuf>,
    pub resume_offset: u64,
    pub offset_source: OffsetSource,
}

impl TransferDecision {
    fn inline() -> Self {
        Self::default()
    }
}

/// Pre-send findings: the committed sink name (when one is already fixed)
/// and the Range offset to request.
#[derive(Debug, Clone, Default)]
pub struct Preflight {
    /// Sink name fixed before the response: the resumable local file, or the
    /// probe's Content-Disposition name. Appending commits us to this name.
    pub committed_name: Option<PathBuf>,
    pub resume_offset: u64,
    pub offset_source: OffsetSource,
}

impl Preflight {
    pub fn range_header(&self) -> Option<String> {
        (self.resume_offset > 0).then(|| format!("bytes={}-", self.resume_offset))
    }
}

#[derive(Debug, Clone)]
pub struct Planner {
    download: DownloadMode,
    output: Option<PathBuf>,
    no_ext: bool,
    /// Directory derived filenames land in.
    dir: PathBuf,
}

impl Planner {
    pub fn new(args: &Args) -> Self {
        Planner {
            download: args.download,
            output: args.output.clone(),
            no_ext: args.no_ext,
            dir: PathBuf::from("."),
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn mode(&self) -> DownloadMode {
        self.download
    }

    /// Pre-send half: find a resumable partial under the default name, or
    /// probe for a header-derived one. Probe failures degrade to the
    /// non-resumed path.
    pub async fn preflight(&self, client: &Client, template: &RequestTemplate) -> Preflight {
        let mut pre = Preflight::default();
        if self.download == DownloadMode::No {
            return pre;
        }

        if let Some(candidate) = self.default_path(&template.url) {
            if let Some(len) = fs::resumable_len(&candidate) {
                pre.committed_name = Some(candidate);
                pre.resume_offset = len;
                pre.offset_source = OffsetSource::LocalFile;
                tracing::debug!(offset = len, "resuming from local file");
                return pre;
            }
        }

        // A forced download with nothing on disk under the default name may
        // still be resumable under the name the server will assign.
        if self.download == DownloadMode::Yes && self.output.is_none() {
            match client
                .request(Method::HEAD, template.url.clone())
                .headers(template.headers.clone())
                .send()
                .await
            {
                Ok(response) => {
                    if let Some(name) = header_filename(response.headers()) {
                        let path = self.dir.join(&name);
                        if let Some(len) = fs::resumable_len(&path) {
                            pre.resume_offset = len;
                            pre.offset_source = OffsetSource::Probe;
                            tracing::debug!(offset = len, name = %name, "resuming probe-named file");
                        }
                        pre.committed_name = Some(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("resume probe failed, downloading from scratch: {}", e);
                }
            }
        }

        pre
    }

    /// Post-response half.
    pub fn decide(
        &self,
        method: &Method,
        pre: &Preflight,
        headers: &HeaderMap,
        url: &Url,
    ) -> TransferDecision {
        if *method == Method::HEAD || self.download == DownloadMode::No {
            return TransferDecision::inline();
        }

        let response_name = match pre.committed_name {
            Some(_) => None,
            None => header_filename(headers),
        };
        let kind = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(InlineKind::from_content_type);
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let header_named =
            response_name.is_some() || pre.offset_source == OffsetSource::Probe;
        // A committed Range already promised to append to the partial file;
        // the inline heuristics must not strand it.
        let to_file = self.download == DownloadMode::Yes
            || header_named
            || pre.resume_offset > 0
            || content_length > INLINE_THRESHOLD
            || kind.is_none();
        if !to_file {
            return TransferDecision::inline();
        }

        // Name priority: explicit output, the committed pre-flight name, the
        // response header, then the URL with a synthesized extension.
        let filename = if let Some(output) = &self.output {
            output.clone()
        } else if let Some(committed) = &pre.committed_name {
            committed.clone()
        } else if let Some(name) = response_name {
            self.dir.join(name)
        } else {
            let stem = fs::filename_from_url(url).unwrap_or_else(|| "index".to_string());
            self.dir.join(self.with_extension(stem, kind, headers))
        };

        TransferDecision {
            to_file: true,
            filename: Some(filename),
            resume_offset: pre.resume_offset,
            offset_source: pre.offset_source,
        }
    }

    fn default_path(&self, url: &Url) -> Option<PathBuf> {
        if let Some(output) = &self.output {
            return Some(output.clone());
        }
        fs::filename_from_url(url).map(|name| self.dir.join(name))
    }

    /// URL-derived names without an extension get one synthesized from the
    /// content type, unless `--no-ext` was given.
    fn with_extension(&self, name: String, kind: Option<InlineKind>, headers: &HeaderMap) -> String {
        if self.no_ext || Path::new(&name).extension().is_some() {
            return name;
        }
        let ext = match kind {
            Some(kind) => Some(kind.extension()),
            None => guessed_extension(headers),
        };
        match ext {
            Some(ext) => format!("{}.{}", name, ext),
            None => name,
        }
    }
}

/// Content kinds rendered inline rather than downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineKind {
    Json,
    Xml,
    Text,
}

impl InlineKind {
    fn from_content_type(value: &str) -> Option<Self> {
        let base = value
            .split(';')
            .next()
            .unwrap_or(value)
            .trim()
            .to_ascii_lowercase();
        if base.starts_with("application/") && base.ends_with("json") {
            Some(InlineKind::Json)
        } else if base.ends_with("xml") {
            Some(InlineKind::Xml)
        } else if base.starts_with("text/") {
            Some(InlineKind::Text)
        } else {
            None
        }
    }

    fn extension(self) -> &'static str {
        match self {
            InlineKind::Json => "json",
            InlineKind::Xml => "xml",
            InlineKind::Text => "txt",
        }
    }
}

fn header_filename(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    fs::filename_from_content_disposition(value)
}

fn guessed_extension(headers: &HeaderMap) -> Option<&'static str> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mime = content_type.split(';').next().unwrap_or("").trim();
    if mime.is_empty() || mime == "application/octet-stream" {
        return None;
    }
    mime_guess::get_mime_extensions_str(mime)
        .and_then(|exts| exts.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn planner(download: DownloadMode) -> Planner {
        Planner {
            download,
            output: None,
            no_ext: false,
            dir: PathBuf::from("."),
        }
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                reqwest::header::HeaderName::try_from(*name).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_local_partial_sets_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("out.bin")).unwrap();
        f.write_all(&[0u8; 1024]).unwrap();

        let planner = planner(DownloadMode::Auto).in_dir(dir.path());
        let url = Url::parse("http://example.com/files/out.bin").unwrap();
        let candidate = planner.default_path(&url).unwrap();
        let len = fs::resumable_len(&candidate).unwrap();
        assert_eq!(len, 1024);

        let pre = Preflight {
            committed_name: Some(candidate),
            resume_offset: len,
            offset_source: OffsetSource::LocalFile,
        };
        assert_eq!(pre.range_header().as_deref(), Some("bytes=1024-"));
    }

    #[test]
    fn test_local_resume_commits_to_the_sink() {
        // Auto mode, small text response: inline on a fresh run, but a
        // ranged continuation of a local partial must append to it.
        let planner = planner(DownloadMode::Auto);
        let url = Url::parse("http://example.com/notes.txt").unwrap();
        let pre = Preflight {
            committed_name: Some(PathBuf::from("./notes.txt")),
            resume_offset: 1024,
            offset_source: OffsetSource::LocalFile,
        };
        let decision = planner.decide(
            &Method::GET,
            &pre,
            &headers(&[("content-type", "text/plain"), ("content-length", "100")]),
            &url,
        );
        assert!(decision.to_file);
        assert_eq!(decision.filename, Some(PathBuf::from("./notes.txt")));
        assert_eq!(decision.resume_offset, 1024);
        assert_eq!(decision.offset_source, OffsetSource::LocalFile);
    }

    #[test]
    fn test_json_over_threshold_downloads_with_json_extension() {
        let planner = planner(DownloadMode::Auto);
        let url = Url::parse("http://example.com/api/data").unwrap();
        let decision = planner.decide(
            &Method::GET,
            &Preflight::default(),
            &headers(&[("content-type", "application/json"), ("content-length", "5000")]),
            &url,
        );
        assert!(decision.to_file);
        let name = decision.filename.unwrap();
        assert!(name.to_string_lossy().ends_with("data.json"), "{:?}", name);
    }

    #[test]
    fn test_no_ext_suppresses_synthesis() {
        let mut p = planner(DownloadMode::Auto);
        p.no_ext = true;
        let url = Url::parse("http://example.com/api/data").unwrap();
        let decision = p.decide(
            &Method::GET,
            &Preflight::default(),
            &headers(&[("content-type", "application/json"), ("content-length", "5000")]),
            &url,
        );
        assert!(decision.filename.unwrap().to_string_lossy().ends_with("data"));
    }

    #[test]
    fn test_small_text_stays_inline() {
        let planner = planner(DownloadMode::Auto);
        let url = Url::parse("http://example.com/greeting").unwrap();
        let decision = planner.decide(
            &Method::GET,
            &Preflight::default(),
            &headers(&[("content-type", "text/plain"), ("content-length", "100")]),
            &url,
        );
        assert!(!decision.to_file);
        assert_eq!(decision, TransferDecision::default());
    }

    #[test]
    fn test_head_is_never_downloaded() {
        let planner = planner(DownloadMode::Yes);
        let url = Url::parse("http://example.com/big.bin").unwrap();
        let decision = planner.decide(
            &Method::HEAD,
            &Preflight::default(),
            &headers(&[("content-length", "999999")]),
            &url,
        );
        assert!(!decision.to_file);
    }

    #[test]
    fn test_explicit_no_beats_everything() {
        let planner = planner(DownloadMode::No);
        let url = Url::parse("http://example.com/huge.bin").unwrap();
        let decision = planner.decide(
            &Method::GET,
            &Preflight::default(),
            &headers(&[
                ("content-type", "application/octet-stream"),
                ("content-length", "10000000"),
                ("content-disposition", "attachment; filename=\"huge.bin\""),
            ]),
            &url,
        );
        assert!(!decision.to_file);
    }

    #[test]
    fn test_header_filename_forces_download() {
        let planner = planner(DownloadMode::Auto);
        let url = Url::parse("http://example.com/page").unwrap();
        let decision = planner.decide(
            &Method::GET,
            &Preflight::default(),
            &headers(&[
                ("content-type", "text/plain"),
                ("content-length", "10"),
                ("content-disposition", "attachment; filename=\"notes.txt\""),
            ]),
            &url,
        );
        assert!(decision.to_file);
        assert!(decision.filename.unwrap().to_string_lossy().ends_with("notes.txt"));
    }

    #[test]
    fn test_committed_name_wins_over_response_header() {
        let planner = planner(DownloadMode::Yes);
        let url = Url::parse("http://example.com/f").unwrap();
        let pre = Preflight {
            committed_name: Some(PathBuf::from("./probed.bin")),
            resume_offset: 512,
            offset_source: OffsetSource::Probe,
        };
        let decision = planner.decide(
            &Method::GET,
            &pre,
            &headers(&[("content-disposition", "attachment; filename=\"other.bin\"")]),
            &url,
        );
        assert_eq!(decision.filename, Some(PathBuf::from("./probed.bin")));
        assert_eq!(decision.resume_offset, 512);
        assert_eq!(decision.offset_source, OffsetSource::Probe);
    }

    #[test]
    fn test_unknown_type_downloads() {
        let planner = planner(DownloadMode::Auto);
        let url = Url::parse("http://example.com/blob").unwrap();
        let decision = planner.decide(
            &Method::GET,
            &Preflight::default(),
            &headers(&[
                ("content-type", "application/octet-stream"),
                ("content-length", "100"),
            ]),
            &url,
        );
        assert!(decision.to_file);
    }

    #[test]
    fn test_empty_path_synthesizes_index() {
        let planner = planner(DownloadMode::Yes);
        let url = Url::parse("http://example.com/").unwrap();
        let decision = planner.decide(
            &Method::GET,
            &Preflight::default(),
            &headers(&[("content-type", "text/html")]),
            &url,
        );
        let name = decision.filename.unwrap();
        assert!(name.to_string_lossy().ends_with("index.txt"), "{:?}", name);
    }

    #[test]
    fn test_output_flag_wins() {
        let mut p = planner(DownloadMode::Yes);
        p.output = Some(PathBuf::from("/tmp/custom.out"));
        let url = Url::parse("http://example.com/f.bin").unwrap();
        let decision = p.decide(&Method::GET, &Preflight::default(), &HeaderMap::new(), &url);
        assert_eq!(decision.filename, Some(PathBuf::from("/tmp/custom.out")));
    }
}
