//! Shape of a class loading hook
//!
//! A host runtime calls a [`ClassFileTransformer`] with the bytes of every class it is about to
//! define, possibly from several threads at once. Unlike the rest of the crate, hooks never fail:
//! returning `None` leaves the class as it was.

use crate::instrument::{transform_class, Settings};

/// Hook called on every class definition or redefinition
pub trait ClassFileTransformer: Send + Sync {
    /// Transform a class file
    ///
    /// `loader` names the defining class loader (`None` for the bootstrap loader), `class_name`
    /// is the internal name of the class, and `redefining` is set when an already loaded class is
    /// being redefined. Returns `None` when no transformation applies.
    fn transform(
        &self,
        loader: Option<&str>,
        class_name: &str,
        redefining: bool,
        class_file: &[u8],
    ) -> Option<Vec<u8>>;
}

/// Hook running the entry logging pass
///
/// Any failure is logged and treated as "no transformation", so that one unreadable class never
/// stops the host from loading it.
#[derive(Debug)]
pub struct EntryLogTransformer {
    settings: Settings,
}

impl EntryLogTransformer {
    pub fn new(settings: Settings) -> EntryLogTransformer {
        EntryLogTransformer { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl ClassFileTransformer for EntryLogTransformer {
    fn transform(
        &self,
        loader: Option<&str>,
        class_name: &str,
        _redefining: bool,
        class_file: &[u8],
    ) -> Option<Vec<u8>> {
        if !self.settings.is_target(class_name) {
            return None;
        }
        match transform_class(class_file, &self.settings) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!(
                    "Leaving '{}' (loader {}) untransformed: {}",
                    class_name,
                    loader.unwrap_or("<bootstrap>"),
                    err
                );
                None
            }
        }
    }
}

/// Several hooks applied one after the other, each seeing the output of the previous one
#[derive(Default)]
pub struct TransformerChain {
    transformers: Vec<Box<dyn ClassFileTransformer>>,
}

impl TransformerChain {
    pub fn new() -> TransformerChain {
        TransformerChain::default()
    }

    /// Register a transformer, to run after those already registered
    pub fn add<T: ClassFileTransformer + 'static>(&mut self, transformer: T) {
        self.transformers.push(Box::new(transformer));
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl ClassFileTransformer for TransformerChain {
    fn transform(
        &self,
        loader: Option<&str>,
        class_name: &str,
        redefining: bool,
        class_file: &[u8],
    ) -> Option<Vec<u8>> {
        let mut current: Option<Vec<u8>> = None;
        for transformer in &self.transformers {
            let input = current.as_deref().unwrap_or(class_file);
            if let Some(output) = transformer.transform(loader, class_name, redefining, input) {
                current = Some(output);
            }
        }
        current
    }
}
