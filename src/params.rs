use std::{
    collections::{hash_map, HashMap},
    fmt,
    fs::File,
    io,
    ops::Index,
    path::Path,
};

use serde::{Serialize, Serializer};
use tempfile::TempPath;

/// An uploaded file, spooled to a temporary file.
///
/// The temporary file is closed and fully written. It is deleted when the
/// upload is dropped unless it is [persisted](FileUpload::persist) or
/// [kept](FileUpload::keep).
#[derive(Serialize)]
pub struct FileUpload {
    /// The declared content type, `text/plain` when the part has none.
    #[serde(rename = "type")]
    pub content_type: String,
    /// The file name, after the filename policy is applied.
    pub filename: String,
    /// The full disposition name, brackets included.
    pub name: String,
    /// The raw header block of the part.
    pub head: String,
    /// Size of the content in bytes.
    pub size: u64,
    /// The temporary file.
    #[serde(serialize_with = "serialize_temp_path")]
    pub tempfile: TempPath,
}

impl FileUpload {
    /// Gets the path of the temporary file.
    pub fn path(&self) -> &Path {
        &self.tempfile
    }

    /// Opens the temporary file for reading.
    pub fn open(&self) -> io::Result<File> {
        File::open(&self.tempfile)
    }

    /// Moves the temporary file to `to`.
    pub fn persist<P: AsRef<Path>>(self, to: P) -> io::Result<()> {
        self.tempfile.persist(to).map_err(io::Error::from)
    }

    /// Keeps the temporary file where it is, the caller deletes it.
    pub fn keep(self) -> io::Result<std::path::PathBuf> {
        self.tempfile.keep().map_err(io::Error::from)
    }
}

/// Equal when everything but the temporary file matches.
impl PartialEq for FileUpload {
    fn eq(&self, other: &Self) -> bool {
        self.content_type == other.content_type
            && self.filename == other.filename
            && self.name == other.name
            && self.head == other.head
            && self.size == other.size
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("type", &self.content_type)
            .field("filename", &self.filename)
            .field("name", &self.name)
            .field("head", &self.head)
            .field("size", &self.size)
            .field("tempfile", &self.tempfile.display())
            .finish()
    }
}

fn serialize_temp_path<S: Serializer>(path: &TempPath, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&path.to_string_lossy())
}

/// A parameter value.
#[derive(Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A text field.
    Text(String),
    /// An uploaded file.
    File(FileUpload),
    /// Fields nested under a bracketed name.
    Node(Params),
}

impl Value {
    /// Gets the text, if this is a text field.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Gets the upload, if this is a file.
    pub fn as_file(&self) -> Option<&FileUpload> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    /// Gets the nested params, if this is a node.
    pub fn as_node(&self) -> Option<&Params> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Gets a nested value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_node().and_then(|node| node.get(key))
    }

    /// Takes the upload out, if this is a file.
    pub fn into_file(self) -> Option<FileUpload> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }
}

impl Index<&str> for Value {
    type Output = Value;

    /// # Panics
    ///
    /// If this is not a node or the key is missing.
    fn index(&self, key: &str) -> &Value {
        match self {
            Self::Node(node) => &node[key],
            _ => panic!("cannot look up `{key}` in a value that is not a node"),
        }
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_text() == Some(other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}

/// Form parameters, keyed by name, nested by bracket notation.
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params(HashMap<String, Value>);

impl Params {
    /// Creates empty params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Gets a mutable value.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Inserts a value at this level, returning the one it replaces.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Whether the key is present at this level.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of keys at this level.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over this level.
    pub fn iter(&self) -> hash_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Inserts under a disposition name.
    ///
    /// `foo[bar][baz]` walks or creates `foo` and `bar` and sets `baz`. Empty
    /// brackets are ignored. A name that is not well-formed bracket notation
    /// is used as a plain key. A later write to the same key wins, also when
    /// it has to turn a text or file into a node.
    pub fn insert_nested(&mut self, name: &str, value: Value) {
        match split_name(name) {
            Some(keys) => self.insert_path(&keys, value),
            None => {
                self.0.insert(name.to_owned(), value);
            }
        }
    }

    fn insert_path(&mut self, keys: &[&str], value: Value) {
        match keys {
            [] => {}
            [key] => {
                self.0.insert((*key).to_owned(), value);
            }
            [key, rest @ ..] => {
                let entry = self
                    .0
                    .entry((*key).to_owned())
                    .or_insert_with(|| Value::Node(Params::new()));

                if let Value::Node(node) = entry {
                    node.insert_path(rest, value);
                } else {
                    let mut node = Params::new();
                    node.insert_path(rest, value);
                    *entry = Value::Node(node);
                }
            }
        }
    }
}

impl Index<&str> for Params {
    type Output = Value;

    /// # Panics
    ///
    /// If the key is missing.
    fn index(&self, key: &str) -> &Value {
        self.0
            .get(key)
            .unwrap_or_else(|| panic!("no parameter named `{key}`"))
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a Value);
    type IntoIter = hash_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Params {
    type Item = (String, Value);
    type IntoIter = hash_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Splits `foo[bar][]` into `["foo", "bar"]`.
fn split_name(name: &str) -> Option<Vec<&str>> {
    let (head, mut rest) = match name.find('[') {
        None => return Some(vec![name]),
        Some(0) => return None,
        Some(i) => name.split_at(i),
    };

    let mut keys = vec![head];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let end = inner.find(']')?;
        let key = &inner[..end];
        if key.contains('[') {
            return None;
        }
        if !key.is_empty() {
            keys.push(key);
        }
        rest = &inner[end + 1..];
    }

    Some(keys)
}
