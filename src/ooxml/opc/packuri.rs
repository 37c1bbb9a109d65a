/// The PackURI value type and helpers for package partnames.
///
/// A PackURI is an absolute partname inside an OPC package such as
/// `/ppt/slides/slide1.xml`. Partnames always start with a forward slash and
/// use forward slashes as separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    uri: String,
}

impl PackURI {
    /// Create a new PackURI. Fails unless `uri` begins with a slash.
    pub fn new<S: Into<String>>(uri: S) -> Result<Self, String> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(format!("PackURI must begin with slash, got '{}'", uri));
        }
        Ok(PackURI { uri })
    }

    /// Resolve a relationship target against the directory of its source.
    ///
    /// Relative targets (`../slideLayouts/slideLayout1.xml`) are joined to
    /// `base_uri`; absolute targets (`/ppt/media/image1.png`) are taken as
    /// they are. Both are normalized for `.` and `..` segments.
    pub fn from_rel_ref(base_uri: &str, target_ref: &str) -> Result<Self, String> {
        let joined = if target_ref.starts_with('/') {
            target_ref.to_string()
        } else if base_uri.ends_with('/') {
            format!("{}{}", base_uri, target_ref)
        } else {
            format!("{}/{}", base_uri, target_ref)
        };
        Self::new(normalize(&joined))
    }

    /// Directory portion, e.g. `/ppt/slides` for `/ppt/slides/slide1.xml`.
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Final path segment, e.g. `slide1.xml`. Empty for the package URI.
    pub fn filename(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or_default()
    }

    /// Extension without the leading period.
    pub fn ext(&self) -> &str {
        self.filename().rsplit_once('.').map_or("", |(_, ext)| ext)
    }

    /// Numeric suffix of the filename stem, e.g. 21 for `slide21.xml`.
    ///
    /// Singleton partnames such as `presentation.xml` return `None`.
    pub fn idx(&self) -> Option<u32> {
        let filename = self.filename();
        let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem);
        let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 || digits == stem.len() {
            return None;
        }
        atoi_simd::parse::<u32, false, false>(stem[stem.len() - digits..].as_bytes()).ok()
    }

    /// Zip member name (leading slash stripped).
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Relative reference from the directory `base_uri` to this partname.
    ///
    /// `/ppt/slideLayouts/slideLayout1.xml` relative to `/ppt/slides` is
    /// `../slideLayouts/slideLayout1.xml`.
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();
        // The last segment of `to` is the filename and never part of the shared
        // directory prefix.
        let common = from
            .iter()
            .zip(&to[..to.len().saturating_sub(1)])
            .take_while(|(a, b)| a == b)
            .count();

        let mut segments: Vec<&str> = Vec::with_capacity(from.len() - common + to.len() - common);
        segments.extend(std::iter::repeat_n("..", from.len() - common));
        segments.extend(&to[common..]);
        segments.join("/")
    }

    /// Partname of the relationships part for this part, e.g.
    /// `/ppt/slides/_rels/slide1.xml.rels`.
    pub fn rels_uri(&self) -> Result<PackURI, String> {
        let base_uri = self.base_uri();
        let rels = if base_uri == "/" {
            format!("/_rels/{}.rels", self.filename())
        } else {
            format!("{}/_rels/{}.rels", base_uri, self.filename())
        };
        Self::new(rels)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            _ => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

/// The URI for the [Content_Types].xml part
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";
