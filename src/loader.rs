//! Identifier-to-file loaders
//!
//! A loader maps an identifier to a file under one of its directories. The
//! [`LoaderChain`] asks its loaders in order; the first readable file wins and
//! a loader that cannot resolve an identifier leaves it to the next one.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::logger;

/// File extension used when none is configured
pub const DEFAULT_EXTENSION: &str = "html";

const NAMESPACE_SEPARATOR: char = '\\';

/// Something that maps identifiers to files
pub trait Resolve: Send + Sync {
    /// Path of a readable file for `id`, or `None` to decline
    fn resolve(&self, id: &str) -> Option<PathBuf>;
}

impl<F> Resolve for F
where
    F: Fn(&str) -> Option<PathBuf> + Send + Sync,
{
    fn resolve(&self, id: &str) -> Option<PathBuf> {
        self(id)
    }
}

/// Reject identifiers that could escape the loader's directories
fn is_safe(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('/')
        && !id.split(['/', NAMESPACE_SEPARATOR]).any(|segment| segment == "..")
}

fn readable(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

fn check_directory(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || !dir.is_dir() {
        return Err(Error::DirectoryNotFound(dir.to_path_buf()));
    }
    Ok(())
}

/// Single-directory loader
#[derive(Debug, Clone)]
pub struct Import {
    directory: PathBuf,
    extension: String,
    namespaced: bool,
}

impl Import {
    /// Flat lookup: `<dir>/<id>.<ext>`; does not explore recursively
    ///
    /// Identifiers containing a path or namespace separator are declined.
    pub fn directory(dir: impl AsRef<Path>) -> Result<Self> {
        Self::build(dir.as_ref(), false)
    }

    /// Namespace-aware lookup
    ///
    /// `Vendor\Pkg\Class_Name` maps to `<dir>/Vendor/Pkg/Class/Name.<ext>`.
    pub fn namespaced(dir: impl AsRef<Path>) -> Result<Self> {
        Self::build(dir.as_ref(), true)
    }

    fn build(dir: &Path, namespaced: bool) -> Result<Self> {
        check_directory(dir)?;
        Ok(Self {
            directory: dir.to_path_buf(),
            extension: DEFAULT_EXTENSION.to_string(),
            namespaced,
        })
    }

    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn directory_path(&self) -> &Path {
        &self.directory
    }

    fn relative_path(&self, id: &str) -> String {
        if !self.namespaced {
            return format!("{id}.{}", self.extension);
        }
        let id = id.trim_start_matches(NAMESPACE_SEPARATOR);
        let (namespace, name) = id
            .rsplit_once(NAMESPACE_SEPARATOR)
            .unwrap_or(("", id));
        let mut path = String::new();
        if !namespace.is_empty() {
            path.push_str(&namespace.replace(NAMESPACE_SEPARATOR, "/"));
            path.push('/');
        }
        path.push_str(&name.replace('_', "/"));
        path.push('.');
        path.push_str(&self.extension);
        path
    }
}

impl Resolve for Import {
    fn resolve(&self, id: &str) -> Option<PathBuf> {
        if !is_safe(id.trim_start_matches(NAMESPACE_SEPARATOR)) {
            return None;
        }
        if !self.namespaced && id.contains(['/', NAMESPACE_SEPARATOR]) {
            return None;
        }
        readable(self.directory.join(self.relative_path(id)))
    }
}

/// Prefix-stripping loader over several source roots
#[derive(Debug, Clone)]
pub struct ClassLoader {
    prefix: String,
    directories: Vec<PathBuf>,
    extension: String,
}

impl ClassLoader {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            directories: Vec::new(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Loader for a single directory and prefix
    pub fn mount(dir: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        let mut loader = Self::new(prefix);
        loader.add_directory(dir)?;
        Ok(loader)
    }

    /// Add a source root; roots are searched in insertion order
    pub fn add_directory(&mut self, dir: impl AsRef<Path>) -> Result<&mut Self> {
        let dir = dir.as_ref();
        check_directory(dir)?;
        self.directories.push(dir.to_path_buf());
        Ok(self)
    }

    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Resolve for ClassLoader {
    fn resolve(&self, id: &str) -> Option<PathBuf> {
        let rest = id.strip_prefix(&self.prefix)?;
        if !is_safe(rest) {
            return None;
        }
        let relative = format!("{}.{}", rest.replace(NAMESPACE_SEPARATOR, "/"), self.extension);
        self.directories
            .iter()
            .find_map(|dir| readable(dir.join(&relative)))
    }
}

/// Handle returned on registration, used to unregister a loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderId(u64);

/// Ordered set of loaders
#[derive(Default)]
pub struct LoaderChain {
    loaders: Vec<(LoaderId, Box<dyn Resolve>)>,
    next_id: u64,
}

impl fmt::Debug for LoaderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderChain")
            .field("loaders", &self.loaders.len())
            .finish()
    }
}

impl LoaderChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> LoaderId {
        self.next_id += 1;
        LoaderId(self.next_id)
    }

    /// Append a loader
    pub fn register(&mut self, loader: impl Resolve + 'static) -> LoaderId {
        let id = self.next_id();
        self.loaders.push((id, Box::new(loader)));
        id
    }

    /// Insert a loader ahead of the existing ones
    pub fn register_prepend(&mut self, loader: impl Resolve + 'static) -> LoaderId {
        let id = self.next_id();
        self.loaders.insert(0, (id, Box::new(loader)));
        id
    }

    /// Append a custom resolution function
    pub fn handler<F>(&mut self, f: F) -> LoaderId
    where
        F: Fn(&str) -> Option<PathBuf> + Send + Sync + 'static,
    {
        self.register(f)
    }

    /// Remove a loader; returns whether it was registered
    pub fn unregister(&mut self, id: LoaderId) -> bool {
        let before = self.loaders.len();
        self.loaders.retain(|(loader_id, _)| *loader_id != id);
        self.loaders.len() != before
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// First file any loader resolves `id` to
    pub fn resolve(&self, id: &str) -> Option<PathBuf> {
        if !is_safe(id.trim_start_matches(NAMESPACE_SEPARATOR)) {
            logger::log_warning(&format!("Rejected identifier: {id}"));
            return None;
        }
        self.loaders.iter().find_map(|(_, loader)| loader.resolve(id))
    }

    /// Contents of the file `id` resolves to
    pub fn load(&self, id: &str) -> Result<String> {
        let path = self
            .resolve(id)
            .ok_or_else(|| Error::ScriptNotFound(id.to_string()))?;
        logger::log_debug(&format!("Loading {id} from {}", path.display()));
        Ok(fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, *file).unwrap();
        }
        dir
    }

    #[test]
    fn test_import_directory() {
        let dir = fixture(&["index.html", "nested/deep.html"]);
        let import = Import::directory(dir.path()).unwrap();
        assert_eq!(import.resolve("index"), Some(dir.path().join("index.html")));
        assert_eq!(import.resolve("missing"), None);
        assert_eq!(import.resolve("nested/deep"), None);
        assert_eq!(import.resolve("nested\\deep"), None);
        assert!(dir.path().join("nested/deep.html").is_file());
        assert_eq!(import.directory_path(), dir.path());

        let import = import.with_extension(".txt");
        assert_eq!(import.resolve("index"), None);
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            Import::directory(&missing),
            Err(Error::DirectoryNotFound(ref p)) if *p == missing
        ));
        assert!(ClassLoader::mount(&missing, "").is_err());
        assert!(Import::directory("").is_err());
    }

    #[test]
    fn test_import_namespaced() {
        let dir = fixture(&["Acme/Blog/Post/Comment.html", "Plain.html"]);
        let import = Import::namespaced(dir.path()).unwrap();
        assert_eq!(
            import.resolve("Acme\\Blog\\Post_Comment"),
            Some(dir.path().join("Acme/Blog/Post/Comment.html"))
        );
        assert_eq!(
            import.resolve("\\Plain"),
            Some(dir.path().join("Plain.html"))
        );
    }

    #[test]
    fn test_class_loader_prefix_and_order() {
        let first = fixture(&["Model/User.html"]);
        let second = fixture(&["Model/User.html", "Model/Group.html"]);
        let mut loader = ClassLoader::new("App\\");
        loader
            .add_directory(first.path())
            .and_then(|l| l.add_directory(second.path()))
            .unwrap();

        assert_eq!(
            loader.resolve("App\\Model\\User"),
            Some(first.path().join("Model/User.html"))
        );
        assert_eq!(
            loader.resolve("App\\Model\\Group"),
            Some(second.path().join("Model/Group.html"))
        );
        // Identifiers without the prefix are declined
        assert_eq!(loader.resolve("Other\\Model\\User"), None);
        assert_eq!(loader.prefix(), "App\\");
    }

    #[test]
    fn test_chain_order_prepend_and_unregister() {
        let a = fixture(&["page.html"]);
        let b = fixture(&["page.html", "only_b.html"]);
        let mut chain = LoaderChain::new();
        let first = chain.register(Import::directory(a.path()).unwrap());
        chain.register(Import::directory(b.path()).unwrap());

        assert_eq!(chain.resolve("page"), Some(a.path().join("page.html")));
        assert_eq!(chain.resolve("only_b"), Some(b.path().join("only_b.html")));

        assert!(chain.unregister(first));
        assert!(!chain.unregister(first));
        assert_eq!(chain.resolve("page"), Some(b.path().join("page.html")));

        let pinned = a.path().join("page.html");
        chain.register_prepend(move |id: &str| (id == "page").then(|| pinned.clone()));
        assert_eq!(chain.resolve("page"), Some(a.path().join("page.html")));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_handler_and_load() {
        let dir = fixture(&["greeting.html"]);
        let root = dir.path().to_path_buf();
        let mut chain = LoaderChain::new();
        chain.handler(move |id| readable(root.join(format!("{id}.html"))));

        assert_eq!(chain.load("greeting").unwrap(), "greeting.html");
        assert!(matches!(
            chain.load("absent"),
            Err(Error::ScriptNotFound(ref id)) if id == "absent"
        ));
    }

    #[test]
    fn test_traversal_rejected() {
        let dir = fixture(&["views/index.html", "secret.html"]);
        let mut chain = LoaderChain::new();
        chain.register(Import::directory(dir.path().join("views")).unwrap());
        assert_eq!(chain.resolve("../secret"), None);
        assert_eq!(chain.resolve("/etc/passwd"), None);
        assert_eq!(chain.resolve(""), None);
        assert!(chain.resolve("index").is_some());

        let import = Import::namespaced(dir.path().join("views")).unwrap();
        assert_eq!(import.resolve("..\\secret"), None);
    }
}
