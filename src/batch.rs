//! Component G: Batch Processor.
//!
//! Drives a [`SourceJob`] to completion: acquire the exclusive lock, load or
//! seed progress, run batches of chunks through the [`crate::api::LlmClient`]
//! with bounded concurrency (grounded on the same `Arc<Semaphore>` +
//! `tokio::spawn` pattern the tool executor uses for fan-out), retry with
//! backoff and temperature escalation, and save in the append-then-record
//! order the progress store requires.

use crate::api::{CallOverrides, LlmClient, Message, ReasoningState, TimeoutMode};
use crate::cancel::{CancelState, CancelToken};
use crate::errors::{EngineError, Result};
use crate::job::{JobOptions, ProgressRecord, PromptTuple, Role, SourceJob};
use crate::resolver::ResolvedConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{info, warn};

const DEFAULT_TEMPERATURE: f32 = 0.7;
const MAX_BACKOFF_MS: u64 = 60_000;
const BACKOFF_BASE_MS: u64 = 5_000;

/// One completed chunk result, in source order, pending append to the
/// target file.
pub struct ChunkResult {
    pub chunk_index: usize,
    pub text: String,
}

/// Run one job to completion or cancellation. Returns the exit code the CLI
/// should use: `0` for success or already-complete, propagates otherwise.
pub async fn run(mut options: JobOptions, config: &crate::config::Config, cancel: CancelToken) -> Result<i32> {
    let source_text = std::fs::read_to_string(&options.source_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::NotFound(options.source_path.clone())
        } else {
            EngineError::Io(e)
        }
    })?;

    if crate::fingerprint::normalize(&source_text).is_empty() {
        return Err(EngineError::EmptyFile);
    }

    if options.source_path == options.target_path {
        return Err(EngineError::SourceTargetSame);
    }

    let resolved = ResolvedConfig::resolve(&options, config)?;
    let fingerprint = crate::fingerprint::fingerprint(&source_text);

    let lock = crate::lock::JobLock::acquire(&fingerprint)?;
    info!(fingerprint = %fingerprint, "acquired job lock");

    let result = run_locked(&mut options, &resolved, &source_text, &fingerprint, config.keep_alive, cancel).await;

    lock.release()?;
    result
}

async fn run_locked(
    options: &mut JobOptions,
    resolved: &ResolvedConfig,
    source_text: &str,
    fingerprint: &str,
    keep_alive: bool,
    cancel: CancelToken,
) -> Result<i32> {
    let existing = crate::progress::load(fingerprint)?;

    let mut job = SourceJob::new(options.source_path.clone(), options.target_path.clone(), source_text, resolved.chunk_size);

    let mut record = match existing {
        Some(record) => {
            if record.is_complete(job.chunks.len()) {
                return Err(EngineError::ProcessingAlreadyComplete);
            }
            job.chunk_index = record.chunk_index;
            record
        }
        None => seed_record(options, resolved),
    };

    let client = LlmClient::new(keep_alive);
    let timeout = Duration::from_secs(record.timeout * 60);
    let timeout_mode = if options.verbose { TimeoutMode::Idle(timeout) } else { TimeoutMode::Hard(timeout) };

    let mut last_batch_start = Instant::now() - Duration::from_millis(record.delay);

    loop {
        if job.is_complete() {
            break;
        }
        if cancel.state() != CancelState::None {
            break;
        }

        let elapsed = last_batch_start.elapsed();
        let configured_delay = Duration::from_millis(record.delay);
        if elapsed < configured_delay {
            tokio::time::sleep(configured_delay - elapsed).await;
        }
        last_batch_start = Instant::now();

        let batch_start = job.chunk_index;
        let batch: Vec<(usize, String)> =
            job.next_batch(resolved.batch_size).iter().cloned().enumerate().map(|(i, text)| (batch_start + i, text)).collect();

        info!(batch_start, batch_size = batch.len(), "starting batch");

        let results = run_batch(&client, &batch, &record, timeout_mode, &cancel).await?;

        let mut pending = String::new();
        for (i, result) in results.iter().enumerate() {
            if i > 0 {
                pending.push_str("\n\n");
            }
            pending.push_str(result);
        }

        job.chunk_index = batch_start + results.len();
        record.chunk_index = job.chunk_index;
        crate::progress::save(fingerprint, &job.target_path, &record, &pending)?;
    }

    if job.is_complete() {
        crate::progress::delete(fingerprint).ok();
        Ok(0)
    } else {
        info!("job cancelled before completion; progress saved");
        Ok(0)
    }
}

async fn run_batch(
    client: &LlmClient,
    batch: &[(usize, String)],
    record: &ProgressRecord,
    timeout_mode: TimeoutMode,
    cancel: &CancelToken,
) -> Result<Vec<String>> {
    let semaphore = Arc::new(Semaphore::new(record.parallel.max(1)));
    let mut handles = Vec::with_capacity(batch.len());

    for (_, chunk_text) in batch {
        let permit = semaphore.clone();
        let client_ref: &LlmClient = client;
        let record_clone = record.clone();
        let cancel_clone = cancel.clone();
        let chunk_text = chunk_text.clone();

        handles.push(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore never closed");
            call_with_retry(client_ref, &chunk_text, &record_clone, timeout_mode, &cancel_clone).await
        });
    }

    let results = futures::future::join_all(handles).await;

    let mut ordered = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(text) => ordered.push(text),
            Err(e) => {
                cancel.force();
                return Err(e);
            }
        }
    }
    Ok(ordered)
}

async fn call_with_retry(
    client: &LlmClient,
    chunk_text: &str,
    record: &ProgressRecord,
    timeout_mode: TimeoutMode,
    cancel: &CancelToken,
) -> Result<String> {
    let messages = build_messages(chunk_text, record);
    let mut attempt: u32 = 1;
    let mut temperature = record.temperature.value().copied().unwrap_or(DEFAULT_TEMPERATURE);
    let mut reasoning = ReasoningState::default();

    loop {
        if cancel.is_cancelled() {
            return Err(EngineError::AbortErr("cancelled before retry attempt".to_string()));
        }

        let overrides = CallOverrides { temperature: Some(temperature) };
        match client.complete(&messages, record, &overrides, &mut reasoning, timeout_mode, cancel).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_cancellation() => return Err(e),
            Err(e) => {
                if attempt >= record.max_attempts {
                    return Err(e);
                }

                let backoff = BACKOFF_BASE_MS.saturating_mul(1 << attempt.min(16)) + (rand::random::<u64>() % 1000);
                let wait_ms = backoff.max(record.delay).min(MAX_BACKOFF_MS);

                if attempt >= 3 {
                    temperature = (temperature + record.temp_increment).min(1.0);
                    temperature = (temperature * 100.0).round() / 100.0;
                }

                warn!(attempt, wait_ms, "request failed, retrying");
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                attempt += 1;
            }
        }
    }
}

fn build_messages(chunk_text: &str, record: &ProgressRecord) -> Vec<Message> {
    let mut messages = Vec::new();

    if record.system_prompt.enabled {
        messages.push(Message::system(record.system_prompt.text.clone()));
    }

    let mut user_text = String::new();
    if record.prepend_prompt.enabled {
        user_text.push_str(&record.prepend_prompt.text);
        user_text.push('\n');
    }
    user_text.push_str(chunk_text);
    messages.push(Message::user(user_text));

    if record.prefill.enabled {
        messages.push(Message::assistant(record.prefill.text.clone()));
    }

    messages
}

fn seed_record(options: &JobOptions, resolved: &ResolvedConfig) -> ProgressRecord {
    use crate::job::Knob;

    ProgressRecord {
        file_name: options.source_path.to_string_lossy().to_string(),
        chunk_index: 0,
        url: resolved.url.clone(),
        api_key: resolved.api_key.clone(),
        delay: resolved.delay_ms,
        max_attempts: resolved.max_attempts,
        temp_increment: resolved.temp_increment,
        model: options.model.clone().map(Knob::Enabled).unwrap_or_default(),
        temperature: options.temperature.map(Knob::Enabled).unwrap_or_default(),
        top_p: options.top_p.map(Knob::Enabled).unwrap_or_default(),
        top_k: options.top_k.map(Knob::Enabled).unwrap_or_default(),
        presence_penalty: options.presence_penalty.map(Knob::Enabled).unwrap_or_default(),
        seed: options.seed.map(Knob::Enabled).unwrap_or_default(),
        timeout: resolved.timeout_minutes,
        system_prompt: options.system_prompt.clone().map(|t| PromptTuple::new(t, Role::System)).unwrap_or_else(|| PromptTuple::disabled(Role::System)),
        prepend_prompt: options.prepend_prompt.clone().map(|t| PromptTuple::new(t, Role::User)).unwrap_or_else(|| PromptTuple::disabled(Role::User)),
        prefill: options.prefill.clone().map(|t| PromptTuple::new(t, Role::Assistant)).unwrap_or_else(|| PromptTuple::disabled(Role::Assistant)),
        chunk_size: resolved.chunk_size,
        batch_size: resolved.batch_size,
        parallel: resolved.parallel,
        reasoning_effort: options.reasoning_effort.clone().map(Knob::Enabled).unwrap_or_default(),
        enable_thinking: options.enable_thinking.map(Knob::Enabled).unwrap_or_default(),
    }
}
