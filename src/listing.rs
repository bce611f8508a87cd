//! Directory listing pages.
//!
//! A [`Listing`] is the view-model of one directory: breadcrumbs, entries and counts.
//! [`render`] turns it into a complete HTML document.

use std::io;
use std::path::{Path, PathBuf};

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::config::ListingOptions;

/// MIME prefixes the hover preview frame knows how to show
pub const PREVIEW_MIME_PREFIXES: &[&str] = &[
    "image/",
    "text/html",
    "text/",
    "video/",
    "application/pdf",
    "application/json",
    "application/javascript",
];

/// Previews that load the bare file URL rather than the `force=view` URL
const RAW_PREVIEW_MIME_PREFIXES: &[&str] = &["image/", "text/html", "application/pdf"];

const ROOT_LABEL: &str = "$root";

const PREVIEW_SCRIPT: &str = r#"(function () {
  var prefixes = __PREFIXES__;
  var rawPrefixes = __RAW_PREFIXES__;
  var frame = document.getElementById('preview');
  var matches = function (list, mime) {
    return list.some(function (p) { return mime.indexOf(p) === 0; });
  };
  document.querySelectorAll('a.btn.view').forEach(function (link) {
    link.addEventListener('mouseenter', function () {
      var mime = link.getAttribute('data-mime') || '';
      if (!matches(prefixes, mime)) return;
      var src = link.href;
      if (matches(rawPrefixes, mime)) src = src.split('?')[0];
      frame.onload = function () {
        if (mime.indexOf('image/') !== 0) return;
        var doc = frame.contentDocument;
        var img = doc && doc.querySelector('img');
        if (!img) return;
        frame.style.width = img.naturalWidth + 'px';
        frame.style.height = img.naturalHeight + 'px';
      };
      frame.src = src;
      frame.hidden = false;
    });
    link.addEventListener('mouseleave', function () {
      frame.hidden = true;
      frame.removeAttribute('src');
      frame.style.width = '';
      frame.style.height = '';
    });
  });
})();"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// One child of the listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Inferred MIME type; empty for directories and unknown extensions
    pub mime: String,
}

impl ListingEntry {
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            mime: String::new(),
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        let name = name.into();
        let mime = guess_mime(Path::new(&name));
        Self {
            name,
            kind: EntryKind::File,
            mime,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// A navigation link to one ancestor of the current directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub label: String,
    /// Percent-encoded absolute URL path, always ending in `/`
    pub href: String,
}

/// View-model of a directory listing page
#[derive(Debug, Clone)]
pub struct Listing {
    /// Decoded request path, e.g. `/docs/`
    pub current_path: String,
    /// Absolute filesystem path of the directory
    pub abs_path: PathBuf,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub entries: Vec<ListingEntry>,
}

impl Listing {
    pub fn new(current_path: &str, abs_path: &Path, entries: Vec<ListingEntry>) -> Self {
        Self {
            current_path: current_path.to_string(),
            abs_path: abs_path.to_path_buf(),
            breadcrumbs: breadcrumbs(current_path),
            entries,
        }
    }

    pub fn is_root(&self) -> bool {
        self.current_path.trim_matches('/').is_empty()
    }

    pub fn folder_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_dir()).count()
    }

    pub fn file_count(&self) -> usize {
        self.entries.len() - self.folder_count()
    }

    /// Encoded URL path of this directory, with a trailing `/`
    pub fn href(&self) -> &str {
        self.breadcrumbs.last().map(|c| c.href.as_str()).unwrap_or("/")
    }

    /// Footer line, e.g. `1 folder(s) & 2 file(s) in /srv/share`
    pub fn summary(&self) -> String {
        self.summary_with_path(&self.abs_path.display().to_string())
    }

    fn summary_with_path(&self, path: &str) -> String {
        format!(
            "{} folder(s) & {} file(s) in {}",
            self.folder_count(),
            self.file_count(),
            path
        )
    }
}

/// Infer a MIME type from a file name, empty when unknown.
pub fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or_default()
        .to_string()
}

/// Read the immediate children of `dir`, hidden entries included.
///
/// Directories come first, then files, each group ordered by case-insensitive name.
/// Symlinks are classified by their target; dangling links count as files.
pub fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type()?;

        let is_dir = if file_type.is_symlink() {
            entry.path().is_dir()
        } else {
            file_type.is_dir()
        };

        entries.push(if is_dir {
            ListingEntry::directory(name)
        } else {
            ListingEntry::file(name)
        });
    }

    sort_entries(&mut entries);
    Ok(entries)
}

fn sort_entries(entries: &mut [ListingEntry]) {
    entries.sort_by(|a, b| match (a.kind, b.kind) {
        (EntryKind::Directory, EntryKind::File) => std::cmp::Ordering::Less,
        (EntryKind::File, EntryKind::Directory) => std::cmp::Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });
}

/// Split a decoded path into cumulative links, starting with the root.
///
/// `/a/b/` yields links to `/`, `/a/` and `/a/b/`.
pub fn breadcrumbs(current_path: &str) -> Vec<Breadcrumb> {
    let mut crumbs = vec![Breadcrumb {
        label: ROOT_LABEL.to_string(),
        href: "/".to_string(),
    }];
    let mut href = String::from("/");

    for segment in current_path.split('/').filter(|s| !s.is_empty()) {
        href.push_str(&urlencoding::encode(segment));
        href.push('/');
        crumbs.push(Breadcrumb {
            label: segment.to_string(),
            href: href.clone(),
        });
    }

    crumbs
}

/// Render a complete listing page.
///
/// `qr_svg` is inlined as-is when present.
pub fn render(listing: &Listing, options: &ListingOptions, qr_svg: Option<&str>) -> String {
    let mut html = String::with_capacity(4096 + listing.entries.len() * 512);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>{}</title>\n",
        encode_text(&listing.current_path)
    ));
    // Relative entry links must resolve against the directory even without a trailing slash
    html.push_str(&format!(
        "<base href=\"{}\">\n",
        encode_double_quoted_attribute(listing.href())
    ));
    html.push_str(&format!("<style>{}</style>\n", options.stylesheet));
    html.push_str("</head>\n<body>\n");

    let crumbs: Vec<String> = listing
        .breadcrumbs
        .iter()
        .map(|c| {
            format!(
                "<a href=\"{}\">{}</a>",
                encode_double_quoted_attribute(&c.href),
                encode_text(&c.label)
            )
        })
        .collect();
    html.push_str(&format!(
        "<h3 class=\"breadcrumb\">{}</h3>\n",
        crumbs.join(" / ")
    ));

    html.push_str("<ul class=\"entries\">\n");
    if listing.is_root() {
        html.push_str("<li><a class=\"link back\" href=\"./\">.</a></li>\n");
    } else {
        html.push_str("<li><a class=\"link back\" href=\"../\">..</a></li>\n");
    }
    for entry in &listing.entries {
        render_entry(&mut html, entry);
    }
    html.push_str("</ul>\n");

    let abs_path = listing.abs_path.display().to_string();
    html.push_str(&format!(
        "<span class=\"subtitle\">{}</span>\n",
        listing.summary_with_path(&encode_text(&abs_path))
    ));

    if options.preview {
        html.push_str("<iframe id=\"preview\" class=\"preview\" hidden></iframe>\n");
        html.push_str(&format!("<script>{}</script>\n", preview_script()));
    }

    if let Some(svg) = qr_svg {
        html.push_str(&format!("<div class=\"qrcode\">{svg}</div>\n"));
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_entry(html: &mut String, entry: &ListingEntry) {
    let href = format!("./{}", urlencoding::encode(&entry.name));
    let name = encode_text(&entry.name);

    if entry.is_dir() {
        html.push_str(&format!(
            "<li><a class=\"link folder\" href=\"{href}/\">{name}/</a></li>\n"
        ));
        return;
    }

    let mime_attr = encode_double_quoted_attribute(&entry.mime);
    let mime_query = urlencoding::encode(&entry.mime);
    html.push_str(&format!(
        "<li>\n\
         <a class=\"btn download\" title=\"download\" href=\"{href}?force=download\">&#x2B07;</a>\n\
         <a class=\"btn text\" title=\"view as text\" href=\"{href}?force=txt\">txt</a>\n\
         <a class=\"btn view\" title=\"preview\" data-mime=\"{mime_attr}\" href=\"{href}?force=view&amp;mime={mime_query}\">view</a>\n\
         <a class=\"link file\" href=\"{href}\">{name}<span class=\"mime\">{mime}</span></a>\n\
         </li>\n",
        mime = encode_text(&entry.mime),
    ));
}

fn preview_script() -> String {
    let prefixes = serde_json::to_string(PREVIEW_MIME_PREFIXES).unwrap_or_default();
    let raw_prefixes = serde_json::to_string(RAW_PREVIEW_MIME_PREFIXES).unwrap_or_default();
    PREVIEW_SCRIPT
        .replace("__PREFIXES__", &prefixes)
        .replace("__RAW_PREFIXES__", &raw_prefixes)
}

/// Minimal page playing `src` in a native video element.
pub fn render_video_page(src: &str, mime: &str) -> String {
    let src = encode_double_quoted_attribute(src);
    let mime = encode_double_quoted_attribute(mime);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{src}</title>\n\
         <style>body {{ margin: 0; background: #000; }} video {{ display: block; width: 100%; max-height: 100vh; }}</style>\n\
         </head>\n<body>\n\
         <video class=\"player\" controls autoplay><source src=\"{src}\" type=\"{mime}\"></video>\n\
         </body>\n</html>\n"
    )
}
