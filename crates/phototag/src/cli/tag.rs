//! The `phototag tag` command.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use phototag_core::{Config, ModelCache, Tagger};
use serde::Serialize;

/// Arguments for the `tag` command.
#[derive(Args, Debug)]
pub struct TagArgs {
    /// Photo to tag
    #[arg(required = true)]
    pub input: PathBuf,

    /// Print each tag with its confidence
    #[arg(short, long)]
    pub confidence: bool,

    /// Minimum confidence a tag needs, in [0, 1]
    #[arg(long)]
    pub min_confidence: Option<f32>,

    /// Maximum number of tags to print
    #[arg(long)]
    pub max_tags: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum TagOutput {
    Names(Vec<String>),
    Scored(Vec<ScoredTag>),
}

#[derive(Debug, Serialize)]
struct ScoredTag {
    tag: String,
    confidence: f32,
}

/// Execute the tag command.
pub async fn execute(args: TagArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(min_confidence) = args.min_confidence {
        config.tagging.min_confidence = min_confidence;
    }
    if let Some(max_tags) = args.max_tags {
        config.tagging.max_tags = max_tags;
    }
    config.validate()?;

    let cache = Arc::new(ModelCache::from_config(&config));
    let tagger = Tagger::new(cache, &config)?;
    let input = args.input;
    let confidence = args.confidence;

    let output = tokio::task::spawn_blocking(move || {
        if confidence {
            tagger
                .tag_photo_with_confidence(&input)
                .map(|pairs| {
                    TagOutput::Scored(
                        pairs
                            .into_iter()
                            .map(|(tag, confidence)| ScoredTag { tag, confidence })
                            .collect(),
                    )
                })
        } else {
            tagger.tag_photo(&input).map(TagOutput::Names)
        }
    })
    .await??;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
