use super::dictionary::Dictionary;
use super::node::{Entries, Node, NodeKind, Value};
use super::primitive::Name;
use crate::document::{Document, DocumentInner};
use crate::error::{PdfError, Result};
use parking_lot::Mutex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Codec seam for stream filters. The library ships no codecs; callers
/// plug one in through `DocumentOptions::with_decoder`.
pub trait StreamDecoder: Send + Sync {
    fn decode(&self, filter: &Name, params: Option<&Node>, data: &[u8]) -> Result<Vec<u8>>;
}

/// Where a stream's bytes live.
#[derive(Debug, Clone)]
pub enum Body {
    /// In memory.
    Local(Arc<Vec<u8>>),
    /// A region of the owning document's backing bytes, read on demand.
    Pending {
        offset: u64,
        length: usize,
        source: Weak<DocumentInner>,
    },
    /// A file designated by the stream's `/F` entry.
    External(PathBuf),
}

impl Body {
    fn load(&self) -> Result<Arc<Vec<u8>>> {
        match self {
            Body::Local(bytes) => Ok(bytes.clone()),
            Body::Pending {
                offset,
                length,
                source,
            } => {
                let document = source
                    .upgrade()
                    .map(Document)
                    .ok_or_else(|| PdfError::structural("stream source document was dropped"))?;
                Ok(Arc::new(document.read_bytes(*offset, *length)?))
            }
            Body::External(path) => fs::read(path)
                .map(Arc::new)
                .map_err(|err| PdfError::external(path, err)),
        }
    }

    fn same_location(&self, other: &Body) -> bool {
        match (self, other) {
            (Body::Local(a), Body::Local(b)) => Arc::ptr_eq(a, b) || a == b,
            (
                Body::Pending {
                    offset: a_offset,
                    length: a_length,
                    source: a_source,
                },
                Body::Pending {
                    offset: b_offset,
                    length: b_length,
                    source: b_source,
                },
            ) => a_offset == b_offset && a_length == b_length && a_source.ptr_eq(b_source),
            (Body::External(a), Body::External(b)) => a == b,
            _ => false,
        }
    }
}

/// Payload of a stream node: its dictionary plus a lazily loaded body.
pub struct StreamData {
    pub(crate) dict: Entries,
    pub(crate) body: Body,
    raw: Mutex<Option<Arc<Vec<u8>>>>,
    decoded: Mutex<Option<Decoded>>,
}

/// Filters with their parameters, in application order.
type FilterChain = Vec<(Name, Option<Node>)>;

/// Decoded bytes and the filter chain they were decoded with.
struct Decoded {
    chain: FilterChain,
    bytes: Arc<Vec<u8>>,
}

impl StreamData {
    pub(crate) fn new(dict: Entries, body: Body) -> Self {
        Self {
            dict,
            body,
            raw: Mutex::new(None),
            decoded: Mutex::new(None),
        }
    }

    /// Same body and loaded bytes, fresh dictionary, no decoded cache.
    pub(crate) fn duplicate_with(&self, dict: Entries) -> Self {
        Self {
            dict,
            body: self.body.clone(),
            raw: Mutex::new(self.raw.lock().clone()),
            decoded: Mutex::new(None),
        }
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    fn reset_caches(&mut self) {
        *self.raw.get_mut() = None;
        *self.decoded.get_mut() = None;
    }

    fn cached_or_load(&self) -> Result<Arc<Vec<u8>>> {
        match self.raw.lock().clone() {
            Some(bytes) => Ok(bytes),
            None => self.body.load(),
        }
    }

    pub(crate) fn same_body(&self, other: &StreamData) -> bool {
        if self.body.same_location(&other.body) {
            return true;
        }
        match (self.cached_or_load(), other.cached_or_load()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for StreamData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamData")
            .field("dict", &self.dict)
            .field("body", &self.body)
            .field("loaded", &self.raw.lock().is_some())
            .finish()
    }
}

/// Stream view over a shared node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream(Node);

impl Stream {
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_dictionary(Dictionary::new(), data)
    }

    /// Builds a stream from the entries of `dictionary` and a local body.
    /// `Length` is set from the body.
    pub fn with_dictionary(dictionary: Dictionary, data: Vec<u8>) -> Self {
        let mut entries: Entries = dictionary.entries().into_iter().collect();
        entries.insert(Name::new("Length"), Node::integer(data.len() as i64));
        let body = Body::Local(Arc::new(data));
        Self(Node::new(Value::Stream(StreamData::new(entries, body))))
    }

    pub(crate) fn from_node(node: Node) -> Self {
        Self(node)
    }

    pub fn node(&self) -> &Node {
        &self.0
    }

    pub fn into_node(self) -> Node {
        self.0
    }

    /// Dictionary view over this stream's entries.
    pub fn dictionary(&self) -> Dictionary {
        Dictionary::from_node(self.0.clone())
    }

    pub fn body(&self) -> Option<Body> {
        self.0.with_stream(|data| data.body.clone())
    }

    pub fn external_file(&self) -> Option<PathBuf> {
        match self.body()? {
            Body::External(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_body_loaded(&self) -> bool {
        self.0
            .with_stream(|data| {
                matches!(data.body, Body::Local(_)) || data.raw.lock().is_some()
            })
            .unwrap_or(false)
    }

    /// Raw (still encoded) body. Loaded at most once until
    /// [`reset_body`](Self::reset_body).
    pub fn raw_data(&self) -> Result<Arc<Vec<u8>>> {
        let (cached, body) = self
            .0
            .with_stream(|data| (data.raw.lock().clone(), data.body.clone()))
            .ok_or_else(|| self.not_a_stream())?;
        if let Some(bytes) = cached {
            return Ok(bytes);
        }

        let bytes = body.load()?;
        debug!("Loaded stream body ({} bytes)", bytes.len());
        Ok(self
            .0
            .with_stream(|data| data.raw.lock().get_or_insert_with(|| bytes.clone()).clone())
            .unwrap_or(bytes))
    }

    /// Drops the loaded and decoded caches; the next access reloads.
    pub fn reset_body(&self) {
        self.0.with_stream_mut(StreamData::reset_caches);
    }

    /// Decoded body, through the owning document's decoder.
    pub fn decoded_data(&self) -> Result<Arc<Vec<u8>>> {
        let decoder = self
            .0
            .document()
            .and_then(|doc| doc.options().decoder.clone());
        self.decode(decoder.as_deref())
    }

    pub fn decoded_data_with(&self, decoder: &dyn StreamDecoder) -> Result<Arc<Vec<u8>>> {
        self.decode(Some(decoder))
    }

    fn decode(&self, decoder: Option<&dyn StreamDecoder>) -> Result<Arc<Vec<u8>>> {
        let chain = self.filter_chain()?;
        let cached = self
            .0
            .with_stream(|data| {
                data.decoded
                    .lock()
                    .as_ref()
                    .filter(|decoded| decoded.chain == chain)
                    .map(|decoded| decoded.bytes.clone())
            })
            .flatten();
        if let Some(bytes) = cached {
            return Ok(bytes);
        }

        let raw = self.raw_data()?;
        let decoded = if chain.is_empty() {
            raw
        } else {
            let decoder = decoder.ok_or_else(|| {
                let names: Vec<&str> = chain.iter().map(|(name, _)| name.as_str()).collect();
                PdfError::UnsupportedFilter(names.join(", "))
            })?;
            let mut bytes = raw.to_vec();
            for (filter, params) in &chain {
                bytes = decoder.decode(filter, params.as_ref(), &bytes)?;
            }
            Arc::new(bytes)
        };

        // Snapshot of the parameters, not the live nodes
        let key = chain
            .into_iter()
            .map(|(filter, params)| (filter, params.map(|p| p.duplicate())))
            .collect();
        self.0.with_stream(|data| {
            *data.decoded.lock() = Some(Decoded {
                chain: key,
                bytes: decoded.clone(),
            })
        });
        Ok(decoded)
    }

    /// External bodies use `FFilter` / `FDecodeParms`.
    fn filter_chain(&self) -> Result<FilterChain> {
        let (filter_key, params_key) = if self.external_file().is_some() {
            ("FFilter", "FDecodeParms")
        } else {
            ("Filter", "DecodeParms")
        };
        let dict = self.dictionary();

        let filters: Vec<Name> = match dict.try_get(filter_key)? {
            None => Vec::new(),
            Some(node) => match node.kind() {
                NodeKind::Name => node.as_name().into_iter().collect(),
                NodeKind::Array => node
                    .children()
                    .iter()
                    .filter_map(|item| item.resolve().ok().flatten())
                    .filter_map(|item| item.as_name())
                    .collect(),
                _ => Vec::new(),
            },
        };

        let params = dict.try_get(params_key)?;
        Ok(filters
            .into_iter()
            .enumerate()
            .map(|(index, filter)| {
                let param = params.as_ref().and_then(|p| match p.kind() {
                    NodeKind::Array => p
                        .as_array()
                        .and_then(|a| a.get(index))
                        .filter(|n| !n.is_null()),
                    NodeKind::Dictionary if index == 0 => Some(p.clone()),
                    _ => None,
                });
                (filter, param)
            })
            .collect())
    }

    /// Replaces the body with local bytes and fixes `Length`.
    pub fn set_data(&self, data: Vec<u8>) {
        let length = data.len() as i64;
        self.0.with_stream_mut(|stream| {
            stream.body = Body::Local(Arc::new(data));
            stream.reset_caches();
        });
        self.dictionary().set("Length", length);
    }

    /// Makes the body local and unfiltered.
    pub fn set_uncompressed_output(&self) -> Result<()> {
        let decoded = self.decoded_data()?;
        let dict = self.dictionary();
        for key in ["Filter", "DecodeParms", "F", "FFilter", "FDecodeParms", "DL"] {
            dict.remove(key);
        }
        self.set_data(decoded.to_vec());
        Ok(())
    }

    /// Moves the body to or from an external file.
    ///
    /// `target` of `None` means a local body. With `preserve_data` the
    /// bytes follow the stream (written out, copied, or read back in) and
    /// the filter keys move between `Filter`/`DecodeParms` and
    /// `FFilter`/`FDecodeParms`; without it only the designation changes.
    pub fn redirect(&self, target: Option<&Path>, preserve_data: bool) -> Result<()> {
        let dict = self.dictionary();
        match (self.external_file(), target) {
            (None, None) => return Ok(()),
            (None, Some(path)) => {
                if preserve_data {
                    let raw = self.raw_data()?;
                    fs::write(path, raw.as_slice()).map_err(|err| PdfError::external(path, err))?;
                    rename_key(&dict, "Filter", "FFilter");
                    rename_key(&dict, "DecodeParms", "FDecodeParms");
                } else {
                    dict.remove("Filter");
                    dict.remove("DecodeParms");
                }
                self.point_at(Body::External(path.to_path_buf()));
                dict.set("F", path.to_string_lossy().into_owned());
                dict.set("Length", 0);
            }
            (Some(current), Some(path)) => {
                if preserve_data && current != path {
                    fs::copy(&current, path).map_err(|err| PdfError::external(path, err))?;
                }
                self.point_at(Body::External(path.to_path_buf()));
                dict.set("F", path.to_string_lossy().into_owned());
            }
            (Some(current), None) => {
                if preserve_data {
                    let bytes = fs::read(&current).map_err(|err| PdfError::external(&current, err))?;
                    let length = bytes.len() as i64;
                    self.point_at(Body::Local(Arc::new(bytes)));
                    rename_key(&dict, "FFilter", "Filter");
                    rename_key(&dict, "FDecodeParms", "DecodeParms");
                    dict.remove("F");
                    dict.set("Length", length);
                } else {
                    self.point_at(Body::Local(Arc::new(Vec::new())));
                    for key in ["F", "FFilter", "FDecodeParms"] {
                        dict.remove(key);
                    }
                    dict.set("Length", 0);
                }
            }
        }
        debug!("Redirected stream body to {:?}", target);
        self.0.update();
        Ok(())
    }

    fn point_at(&self, body: Body) {
        self.0.with_stream_mut(|stream| {
            stream.body = body;
            stream.reset_caches();
        });
    }

    fn not_a_stream(&self) -> PdfError {
        PdfError::TypeMismatch {
            expected: NodeKind::Stream.as_str(),
            found: self.0.kind().as_str(),
        }
    }
}

fn rename_key(dict: &Dictionary, from: &str, to: &str) {
    if let Some(value) = dict.remove(from) {
        dict.set(to, value);
    }
}
