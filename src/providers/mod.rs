/*!
 * Translation method interface.
 *
 * The engine never translates by itself: it selects between externally
 * supplied methods registered here by identifier. Typical deployments
 * register a fast local method and a slower context-aware one.
 */

use async_trait::async_trait;
use log::debug;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::errors::MethodInvocationError;
use crate::segment::Segment;

/// Output of one translation invocation
#[derive(Debug, Clone, PartialEq)]
pub struct MethodOutput {
    /// Translated text
    pub text: String,
    /// Method-native confidence in [0, 1], if the method reports one
    pub confidence: Option<f64>,
}

impl MethodOutput {
    pub fn new(text: impl Into<String>, confidence: Option<f64>) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Common trait for all translation methods
///
/// Implementations must be safe to call concurrently; the router invokes
/// them from a bounded pool of in-flight segments.
#[async_trait]
pub trait TranslationMethod: Send + Sync + Debug {
    /// Stable identifier, as referenced by configuration
    fn id(&self) -> &str;

    /// Translate one segment
    ///
    /// # Arguments
    /// * `segment` - The segment to translate
    ///
    /// # Returns
    /// * `Result<MethodOutput, MethodInvocationError>` - The translation or an error
    async fn translate(&self, segment: &Segment) -> Result<MethodOutput, MethodInvocationError>;

    /// Whether the method can currently accept work
    fn is_available(&self) -> bool {
        true
    }
}

/// Translation methods by identifier
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    methods: BTreeMap<String, Arc<dyn TranslationMethod>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method, replacing any previous one with the same id
    pub fn register(&mut self, method: Arc<dyn TranslationMethod>) {
        debug!("Registered translation method '{}'", method.id());
        self.methods.insert(method.id().to_string(), method);
    }

    /// Builder-style registration
    pub fn with(mut self, method: Arc<dyn TranslationMethod>) -> Self {
        self.register(method);
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn TranslationMethod>> {
        self.methods.get(id).cloned()
    }

    /// Registered and reporting itself available
    pub fn is_available(&self, id: &str) -> bool {
        self.methods.get(id).is_some_and(|m| m.is_available())
    }

    pub fn ids(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

pub mod mock;
