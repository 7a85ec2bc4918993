//! The template engine: configuration, state and the interpolation passes.

use crate::delimiters::Delimiters;
use crate::error::TemplateError;
use crate::generators::{Counter, Generator};
use crate::sandbox::{FileCache, FilePolicy};
use crate::segments::{OnUnclosed, Segments};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

const VAR_PREFIX: &str = "var:";
const FILE_PREFIX: &str = "file:";
const RAW_PREFIX: &str = "raw:";
const STR_PREFIX: &str = "str:";

/// Wrapper forms, processed in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrapper {
    Raw,
    Str,
}

impl Wrapper {
    fn prefix(self) -> &'static str {
        match self {
            Wrapper::Raw => RAW_PREFIX,
            Wrapper::Str => STR_PREFIX,
        }
    }
}

/// Output of [`TemplateEngine::render`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    /// Set when the whole template was a single generator placeholder.
    pub generator: Option<Generator>,
}

impl Rendered {
    /// Content type of the generator that produced the whole output, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        self.generator.map(Generator::content_type)
    }
}

/// Builder for [`TemplateEngine`].
///
/// File reads are denied and caching is off unless enabled here.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngineBuilder {
    seed: Option<u64>,
    allow_file_reads: bool,
    file_root: Option<PathBuf>,
    cache_files: bool,
    vars: HashMap<String, String>,
}

impl TemplateEngineBuilder {
    /// Seed the RNG for reproducible output.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Use OS entropy for the RNG.
    pub fn clear_seed(mut self) -> Self {
        self.seed = None;
        self
    }

    pub fn allow_file_reads(mut self, allow: bool) -> Self {
        self.allow_file_reads = allow;
        self
    }

    /// Restrict `file:` reads to paths below `root`. An empty path clears it.
    pub fn file_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.file_root = (!root.as_os_str().is_empty()).then_some(root);
        self
    }

    pub fn clear_file_root(mut self) -> Self {
        self.file_root = None;
        self
    }

    pub fn cache_files(mut self, enabled: bool) -> Self {
        self.cache_files = enabled;
        self
    }

    /// Replace the variable table.
    pub fn vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> TemplateEngine {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        TemplateEngine {
            rng: Mutex::new(rng),
            vars: RwLock::new(self.vars),
            policy: FilePolicy::new(self.allow_file_reads, self.file_root),
            cache: FileCache::new(self.cache_files),
            counter: Counter::default(),
        }
    }
}

/// Resolves templates into payload bytes.
///
/// One engine owns its RNG, counter, variables, file policy and file cache.
/// It is `Send + Sync`; share it behind an `Arc` between concurrent senders.
#[derive(Debug)]
pub struct TemplateEngine {
    rng: Mutex<StdRng>,
    vars: RwLock<HashMap<String, String>>,
    policy: FilePolicy,
    cache: FileCache,
    counter: Counter,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TemplateEngine {
    pub fn builder() -> TemplateEngineBuilder {
        TemplateEngineBuilder::default()
    }

    /// Re-seed the RNG. Affects every random generator from the next call on.
    pub fn reseed(&self, seed: u64) {
        *self.lock_rng() = StdRng::seed_from_u64(seed);
    }

    /// Drop any fixed seed and reseed from OS entropy.
    pub fn clear_seed(&self) {
        *self.lock_rng() = StdRng::from_os_rng();
    }

    /// Replace the whole variable table.
    pub fn set_vars(&self, vars: HashMap<String, String>) {
        *self.vars.write().unwrap_or_else(PoisonError::into_inner) = vars;
    }

    pub fn add_var(&self, name: impl Into<String>, value: impl Into<String>) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    pub fn clear_vars(&self) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn file_policy(&self) -> &FilePolicy {
        &self.policy
    }

    pub fn file_cache(&self) -> &FileCache {
        &self.cache
    }

    /// Enable or disable the file cache. Disabling empties it.
    pub fn set_file_cache_enabled(&self, enabled: bool) {
        self.cache.set_enabled(enabled);
    }

    pub fn clear_file_cache(&self) {
        self.cache.clear();
    }

    /// Last counter value handed out.
    pub fn counter(&self) -> u64 {
        self.counter.current()
    }

    /// Run one generator.
    pub fn generate(&self, generator: Generator) -> Result<Vec<u8>, TemplateError> {
        let mut rng = self.lock_rng();
        generator.generate(&mut *rng, &self.counter)
    }

    /// Resolve `template` to bytes.
    pub fn interpolate(&self, template: &str, delims: &Delimiters) -> Result<Vec<u8>, TemplateError> {
        self.render(template, delims).map(|rendered| rendered.bytes)
    }

    /// Resolve `template`, reporting which generator produced the output when
    /// the template is exactly one generator placeholder.
    ///
    /// Passes run in a fixed order, each over the previous pass's output:
    /// variables, `raw:` wrappers, `str:` wrappers, bare generators, bare
    /// files. Values substituted by one pass are never rescanned.
    pub fn render(&self, template: &str, delims: &Delimiters) -> Result<Rendered, TemplateError> {
        let vars = self.vars.read().unwrap_or_else(PoisonError::into_inner);

        let segments = Segments::from_template(template);
        let segments = self.substitute_vars(segments, delims, &vars)?;
        let segments = self.resolve_wrapper(segments, delims, Wrapper::Raw, &vars)?;
        let segments = self.resolve_wrapper(segments, delims, Wrapper::Str, &vars)?;

        if let Some(generator) = Generator::ALL
            .into_iter()
            .find(|g| template == delims.wrap(g.name()))
        {
            return Ok(Rendered {
                bytes: self.generate(generator)?,
                generator: Some(generator),
            });
        }

        let segments = self.substitute_generators(segments, delims)?;
        let segments = self.substitute_files(segments, delims)?;

        Ok(Rendered {
            bytes: segments.into_bytes(),
            generator: None,
        })
    }

    /// Read a file through the sandbox and the cache.
    pub fn resolve_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, TemplateError> {
        let path = path.as_ref();
        let absolute = self.policy.check(path)?;

        if let Some(content) = self.cache.get(&absolute) {
            return Ok(content);
        }

        let content = std::fs::read(&absolute).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.cache.put(absolute, content.clone());
        Ok(content)
    }

    /// `{open}var:name{close}` becomes the variable's value, or nothing when
    /// the variable is unknown. Unclosed references are left alone.
    fn substitute_vars(
        &self,
        segments: Segments,
        delims: &Delimiters,
        vars: &HashMap<String, String>,
    ) -> Result<Segments, TemplateError> {
        segments.rewrite(
            &delims.prefixed(VAR_PREFIX),
            delims.close(),
            OnUnclosed::Keep,
            |name, _| Ok(lookup_var(vars, &name)),
        )
    }

    fn resolve_wrapper(
        &self,
        segments: Segments,
        delims: &Delimiters,
        wrapper: Wrapper,
        vars: &HashMap<String, String>,
    ) -> Result<Segments, TemplateError> {
        segments.rewrite(
            &delims.prefixed(wrapper.prefix()),
            delims.close(),
            OnUnclosed::Fail(|position| TemplateError::UnclosedPlaceholder { position }),
            |inner, position| {
                let value = self.resolve_inner(inner, position, vars)?;
                match wrapper {
                    Wrapper::Raw => Ok(value),
                    Wrapper::Str => json_string(&value),
                }
            },
        )
    }

    /// Dispatch a wrapper's inner expression: `file:`, `var:`, a generator
    /// name, or else the expression itself as literal text.
    fn resolve_inner(
        &self,
        inner: Vec<u8>,
        position: usize,
        vars: &HashMap<String, String>,
    ) -> Result<Vec<u8>, TemplateError> {
        let expr = match String::from_utf8(inner) {
            Ok(expr) => expr,
            Err(e) => return Ok(e.into_bytes()),
        };

        if let Some(path) = expr.strip_prefix(FILE_PREFIX) {
            if path.is_empty() {
                return Err(TemplateError::EmptyFilePath { position });
            }
            return self.resolve_file(path);
        }
        if let Some(name) = expr.strip_prefix(VAR_PREFIX) {
            return Ok(lookup_var(vars, name.as_bytes()));
        }
        if let Some(generator) = Generator::from_name(&expr) {
            return self.generate(generator);
        }
        Ok(expr.into_bytes())
    }

    /// Every occurrence of one generator's placeholder gets the same value.
    fn substitute_generators(
        &self,
        segments: Segments,
        delims: &Delimiters,
    ) -> Result<Segments, TemplateError> {
        let tokens: Vec<(String, Generator)> = Generator::ALL
            .into_iter()
            .map(|g| (delims.wrap(g.name()), g))
            .collect();
        let mut generated: HashMap<Generator, Vec<u8>> = HashMap::new();

        segments.replace_tokens(delims.open(), &tokens, |generator| {
            if let Some(value) = generated.get(generator) {
                return Ok(value.clone());
            }
            let value = self.generate(*generator)?;
            generated.insert(*generator, value.clone());
            Ok(value)
        })
    }

    fn substitute_files(&self, segments: Segments, delims: &Delimiters) -> Result<Segments, TemplateError> {
        segments.rewrite(
            &delims.prefixed(FILE_PREFIX),
            delims.close(),
            OnUnclosed::Fail(|position| TemplateError::UnclosedFilePlaceholder { position }),
            |path, position| {
                if path.is_empty() {
                    return Err(TemplateError::EmptyFilePath { position });
                }
                let path = String::from_utf8_lossy(&path);
                self.resolve_file(&*path)
            },
        )
    }

    fn lock_rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lookup_var(vars: &HashMap<String, String>, name: &[u8]) -> Vec<u8> {
    std::str::from_utf8(name)
        .ok()
        .and_then(|name| vars.get(name))
        .map(|value| value.as_bytes().to_vec())
        .unwrap_or_default()
}

/// Encode bytes as a quoted JSON string; invalid UTF-8 becomes U+FFFD.
fn json_string(value: &[u8]) -> Result<Vec<u8>, TemplateError> {
    let text = String::from_utf8_lossy(value);
    serde_json::to_vec(&*text).map_err(|e| TemplateError::Encode {
        format: "json",
        message: e.to_string(),
    })
}
