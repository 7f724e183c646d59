//! Component N: CLI glue. Thin by design — flag parsing and
//! [`crate::job::JobOptions`] construction only, no business logic.

use crate::job::JobOptions;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "llmloom")]
#[command(about = "Resumable batch LLM processing engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drive a source file through the LLM, appending results to target.
    Run {
        source: String,
        target: String,

        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        delay: Option<u64>,
        #[arg(long)]
        max_attempts: Option<u32>,
        #[arg(long)]
        temp_increment: Option<f32>,
        #[arg(long)]
        timeout_minutes: Option<u64>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        top_p: Option<f32>,
        #[arg(long)]
        top_k: Option<u32>,
        #[arg(long)]
        presence_penalty: Option<f32>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        system_prompt: Option<String>,
        #[arg(long)]
        prepend_prompt: Option<String>,
        #[arg(long)]
        prefill: Option<String>,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        parallel: Option<usize>,
        #[arg(long)]
        image: Vec<String>,
        #[arg(long)]
        reasoning_effort: Option<String>,
        #[arg(long)]
        enable_thinking: Option<bool>,
        #[arg(short, long)]
        verbose: bool,
    },

    /// Count tokens in a file against a named tokenizer.
    Tokenize {
        file: String,

        #[arg(long)]
        tokenizer: String,

        #[arg(long, default_value_t = true)]
        add_special_tokens: bool,
    },
}

impl Commands {
    pub fn into_job_options(self) -> Option<JobOptions> {
        match self {
            Commands::Run {
                source,
                target,
                url,
                api_key,
                delay,
                max_attempts,
                temp_increment,
                timeout_minutes,
                model,
                temperature,
                top_p,
                top_k,
                presence_penalty,
                seed,
                system_prompt,
                prepend_prompt,
                prefill,
                chunk_size,
                batch_size,
                parallel,
                image,
                reasoning_effort,
                enable_thinking,
                verbose,
            } => Some(JobOptions {
                source_path: source.into(),
                target_path: target.into(),
                url,
                api_key,
                delay,
                max_attempts,
                temp_increment,
                timeout_minutes,
                model,
                temperature,
                top_p,
                top_k,
                presence_penalty,
                seed,
                system_prompt,
                prepend_prompt,
                prefill,
                chunk_size,
                batch_size,
                parallel,
                images: image,
                reasoning_effort,
                enable_thinking,
                verbose,
            }),
            Commands::Tokenize { .. } => None,
        }
    }
}
