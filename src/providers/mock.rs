/*!
 * Mock translation methods for testing.
 *
 * This module provides mock methods that simulate different behaviors:
 * - `MockMethod::working()` - Always succeeds with a fixed confidence
 * - `MockMethod::intermittent()` - Fails every Nth request
 * - `MockMethod::failing()` - Always fails with an error
 * - `MockMethod::slow()` - Answers after a delay, for timeout testing
 * - `MockMethod::empty()` - Answers with an empty text
 * - `MockMethod::repeating()` - Answers with degenerate looped output
 * - `MockMethod::unavailable()` - Reports itself unavailable
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::MethodInvocationError;
use crate::providers::{MethodOutput, TranslationMethod};
use crate::segment::Segment;

/// Behavior mode for the mock method
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds, echoing the source unless a generator is set
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns empty text
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
    /// Returns the first source word looped many times
    Repeating,
    /// Reports itself unavailable and fails if called anyway
    Unavailable,
}

/// Mock translation method
#[derive(Debug)]
pub struct MockMethod {
    id: String,
    behavior: MockBehavior,
    confidence: Option<f64>,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&Segment) -> String>,
}

impl MockMethod {
    /// Create a new mock method with the specified behavior
    pub fn new(id: &str, behavior: MockBehavior, confidence: Option<f64>) -> Self {
        Self {
            id: id.to_string(),
            behavior,
            confidence,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    /// Create a working mock reporting `confidence`
    pub fn working(id: &str, confidence: f64) -> Self {
        Self::new(id, MockBehavior::Working, Some(confidence))
    }

    /// Create a working mock that reports no confidence
    pub fn without_confidence(id: &str) -> Self {
        Self::new(id, MockBehavior::Working, None)
    }

    /// Create an intermittently failing mock
    pub fn intermittent(id: &str, fail_every: usize, confidence: f64) -> Self {
        Self::new(id, MockBehavior::Intermittent { fail_every }, Some(confidence))
    }

    /// Create a mock that always errors
    pub fn failing(id: &str) -> Self {
        Self::new(id, MockBehavior::Failing, None)
    }

    /// Create a mock that answers after `delay_ms`
    pub fn slow(id: &str, delay_ms: u64, confidence: f64) -> Self {
        Self::new(id, MockBehavior::Slow { delay_ms }, Some(confidence))
    }

    /// Create a mock that returns empty text
    pub fn empty(id: &str) -> Self {
        Self::new(id, MockBehavior::Empty, Some(0.9))
    }

    /// Create a mock that returns looped output
    pub fn repeating(id: &str, confidence: f64) -> Self {
        Self::new(id, MockBehavior::Repeating, Some(confidence))
    }

    /// Create a mock that reports itself unavailable
    pub fn unavailable(id: &str) -> Self {
        Self::new(id, MockBehavior::Unavailable, None)
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&Segment) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of translate calls received
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn render(&self, segment: &Segment) -> String {
        match self.custom_response {
            Some(generator) => generator(segment),
            None => segment.text.clone(),
        }
    }

    fn failure(&self, reason: String) -> MethodInvocationError {
        MethodInvocationError::Failed {
            method: self.id.clone(),
            reason,
        }
    }
}

impl Clone for MockMethod {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            behavior: self.behavior,
            confidence: self.confidence,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl TranslationMethod for MockMethod {
    fn id(&self) -> &str {
        &self.id
    }

    async fn translate(&self, segment: &Segment) -> Result<MethodOutput, MethodInvocationError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(MethodOutput::new(self.render(segment), self.confidence)),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(self.failure(format!("Simulated intermittent failure (request #{})", count + 1)))
                } else {
                    Ok(MethodOutput::new(self.render(segment), self.confidence))
                }
            }

            MockBehavior::Failing => Err(self.failure("Simulated method failure".to_string())),

            MockBehavior::Empty => Ok(MethodOutput::new(String::new(), self.confidence)),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(MethodOutput::new(self.render(segment), self.confidence))
            }

            MockBehavior::Repeating => {
                let word = segment.text.split_whitespace().next().unwrap_or("la");
                Ok(MethodOutput::new(vec![word; 12].join(" "), self.confidence))
            }

            MockBehavior::Unavailable => Err(MethodInvocationError::Unavailable { method: self.id.clone() }),
        }
    }

    fn is_available(&self) -> bool {
        self.behavior != MockBehavior::Unavailable
    }
}
