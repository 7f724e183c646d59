//! Component J: Configuration Resolver.
//!
//! Each configurable field is a declarative entry `{validate}` run over the
//! merged (CLI, config-file, resumed-record) input, rather than hand-written
//! if-chains per field. Replaces runtime reflection with a small constant
//! table and a closure-based validator — no code generation, no dynamic
//! dispatch beyond the boxed closure itself.

use crate::errors::{EngineError, Result};

/// A single field's validation rule. `name` is the external option key used
/// in error messages (`INVALID_<NAME>` in spirit, via [`EngineError::InvalidConfig`]).
pub struct FieldEntry<T> {
    pub name: &'static str,
    pub validate: Box<dyn Fn(&T) -> Result<()> + Send + Sync>,
}

impl<T> FieldEntry<T> {
    pub fn new(name: &'static str, validate: impl Fn(&T) -> Result<()> + Send + Sync + 'static) -> Self {
        Self { name, validate: Box::new(validate) }
    }

    pub fn check(&self, value: &T) -> Result<()> {
        (self.validate)(value).map_err(|e| match e {
            EngineError::InvalidConfig { message, .. } => {
                EngineError::InvalidConfig { field: self.name.to_string(), message }
            }
            other => other,
        })
    }
}

fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::InvalidConfig { field: String::new(), message: message.into() }
}

/// Numeric range validator: `min <= value <= max`.
pub fn in_range<T: PartialOrd + std::fmt::Display + Copy>(min: T, max: T) -> impl Fn(&T) -> Result<()> {
    move |v: &T| {
        if *v < min || *v > max {
            Err(invalid(format!("must be between {min} and {max}, got {v}")))
        } else {
            Ok(())
        }
    }
}

/// URL scheme validator: must start with `http://` or `https://`.
pub fn valid_url(v: &String) -> Result<()> {
    if v.starts_with("http://") || v.starts_with("https://") {
        Ok(())
    } else {
        Err(invalid("must start with http:// or https://"))
    }
}

/// Non-empty string validator.
pub fn not_empty(v: &String) -> Result<()> {
    if v.trim().is_empty() {
        Err(invalid("must not be empty"))
    } else {
        Ok(())
    }
}

/// Accepts any value of `T`; used for knobs whose type already enforces the
/// only constraint that applies (a `bool` or a raw `u64` seed).
pub fn any<T>(_: &T) -> Result<()> {
    Ok(())
}

const REASONING_EFFORTS: [&str; 5] = ["none", "low", "medium", "high", "xhigh"];

/// Reasoning-effort enum validator: must be one of `{none, low, medium, high, xhigh}`.
pub fn valid_reasoning_effort(v: &String) -> Result<()> {
    if REASONING_EFFORTS.contains(&v.as_str()) {
        Ok(())
    } else {
        Err(invalid(format!("must be one of {:?}, got '{v}'", REASONING_EFFORTS)))
    }
}

/// Resolved, validated job configuration ready to drive the batch processor.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub url: String,
    pub api_key: String,
    pub delay_ms: u64,
    pub max_attempts: u32,
    pub temp_increment: f32,
    pub timeout_minutes: u64,
    pub chunk_size: usize,
    pub batch_size: usize,
    pub parallel: usize,
}

impl ResolvedConfig {
    /// Resolve from CLI options layered over ambient config defaults. A
    /// resumed [`crate::job::ProgressRecord`] is resolved separately by
    /// `from_progress_record` and always wins when present.
    pub fn resolve(opts: &crate::job::JobOptions, config: &crate::config::Config) -> Result<Self> {
        let url = opts.url.clone().unwrap_or_else(|| config.url.clone());
        FieldEntry::new("url", valid_url).check(&url)?;

        let chunk_size = opts.chunk_size.unwrap_or(1);
        FieldEntry::new("chunkSize", in_range(1usize, 200_000)).check(&chunk_size)?;

        let batch_size = opts.batch_size.unwrap_or(1);
        FieldEntry::new("batchSize", in_range(1usize, 512)).check(&batch_size)?;

        let parallel = opts.parallel.unwrap_or(1);
        FieldEntry::new("parallel", in_range(1usize, 64)).check(&parallel)?;

        let temp_increment = opts.temp_increment.unwrap_or(config.temp_increment);
        FieldEntry::new("tempIncrement", in_range(0.0f32, 2.0)).check(&temp_increment)?;

        let max_attempts = opts.max_attempts.unwrap_or(config.max_attempts);
        if max_attempts < 1 {
            return Err(EngineError::InvalidConfig {
                field: "maxAttempts".to_string(),
                message: "must be >= 1".to_string(),
            });
        }

        if let Some(ref model) = opts.model {
            FieldEntry::new("model", not_empty).check(model)?;
        }
        if let Some(temperature) = opts.temperature {
            FieldEntry::new("temperature", in_range(0.0f32, 2.0)).check(&temperature)?;
        }
        if let Some(top_p) = opts.top_p {
            FieldEntry::new("topP", in_range(0.0f32, 1.0)).check(&top_p)?;
        }
        if let Some(top_k) = opts.top_k {
            FieldEntry::new("topK", in_range(0u32, 1000)).check(&top_k)?;
        }
        if let Some(presence_penalty) = opts.presence_penalty {
            FieldEntry::new("presencePenalty", in_range(-2.0f32, 2.0)).check(&presence_penalty)?;
        }
        if let Some(seed) = opts.seed {
            FieldEntry::new("seed", any).check(&seed)?;
        }
        if let Some(ref reasoning_effort) = opts.reasoning_effort {
            FieldEntry::new("reasoningEffort", valid_reasoning_effort).check(reasoning_effort)?;
        }
        if let Some(enable_thinking) = opts.enable_thinking {
            FieldEntry::new("enableThinking", any).check(&enable_thinking)?;
        }

        Ok(Self {
            url,
            api_key: opts.api_key.clone().or_else(|| config.api_key.clone()).unwrap_or_default(),
            delay_ms: opts.delay.unwrap_or(config.delay_ms),
            max_attempts,
            temp_increment,
            timeout_minutes: opts.timeout_minutes.unwrap_or(config.timeout_minutes),
            chunk_size,
            batch_size,
            parallel,
        })
    }

    pub fn from_progress_record(record: &crate::job::ProgressRecord) -> Self {
        Self {
            url: record.url.clone(),
            api_key: record.api_key.clone(),
            delay_ms: record.delay,
            max_attempts: record.max_attempts,
            temp_increment: record.temp_increment,
            timeout_minutes: record.timeout,
            chunk_size: record.chunk_size,
            batch_size: record.batch_size,
            parallel: record.parallel,
        }
    }
}
