//! Cache subcommands

use crate::error::Result;
use clap::Subcommand;
use serde_json::Value;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::info;
use transcript_cache::{derive_key, ArtifactCache};

/// How a command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    NotFound,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a cached transcript as JSON (exit code 1 on a miss)
    Get { id: String },
    /// Store a transcript read as JSON from a file or stdin
    Set {
        id: String,
        /// Read the transcript from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Remove a cached transcript
    Delete { id: String },
    /// Remove every cached transcript
    Clear,
    /// List cached entries, oldest first
    List,
    /// Show cache statistics
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the cache key derived from an id
    Key { id: String },
}

/// Run a command against an open cache
pub fn run(
    command: Command,
    cache: &ArtifactCache,
    input: &mut impl Read,
    out: &mut impl Write,
) -> Result<Outcome> {
    match command {
        Command::Get { id } => match cache.get::<Value>(&id) {
            Some(artifact) => {
                writeln!(out, "{}", serde_json::to_string_pretty(&artifact)?)?;
            }
            None => {
                info!(id = %id, "Not cached");
                return Ok(Outcome::NotFound);
            }
        },
        Command::Set { id, file } => {
            let artifact: Value = match file {
                Some(path) => serde_json::from_slice(&fs::read(path)?)?,
                None => {
                    let mut raw = String::new();
                    input.read_to_string(&mut raw)?;
                    serde_json::from_str(&raw)?
                }
            };
            cache.set(&id, &artifact)?;
            info!(id = %id, "Stored transcript");
        }
        Command::Delete { id } => {
            cache.delete(&id)?;
            info!(id = %id, "Deleted transcript");
        }
        Command::Clear => cache.clear()?,
        Command::List => {
            for (key, entry) in cache.entries() {
                writeln!(
                    out,
                    "{}  {}  {:>10}  {}",
                    key,
                    entry.stored_at.to_rfc3339(),
                    entry.size_bytes,
                    entry.logical_id
                )?;
            }
        }
        Command::Stats { json } => {
            let stats = cache.stats();
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
            } else {
                writeln!(out, "{}", stats)?;
            }
        }
        Command::Key { id } => writeln!(out, "{}", derive_key(&id))?,
    }

    Ok(Outcome::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};
    use transcript_cache::CacheConfig;

    fn open_cache() -> (TempDir, ArtifactCache) {
        let dir = tempdir().unwrap();
        let cache = ArtifactCache::open(CacheConfig {
            cache_dir: dir.path().to_path_buf(),
            max_age: Duration::from_secs(3600),
            max_total_size: 1024 * 1024,
        })
        .unwrap();
        (dir, cache)
    }

    fn run_with_input(cache: &ArtifactCache, command: Command, input: &str) -> (Outcome, String) {
        let mut out = Vec::new();
        let code = run(command, cache, &mut input.as_bytes(), &mut out).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    fn run_command(cache: &ArtifactCache, command: Command) -> (Outcome, String) {
        run_with_input(cache, command, "")
    }

    #[test]
    fn test_set_from_stdin_then_get() {
        let (_dir, cache) = open_cache();
        let transcript = r#"{"video_id": "dQw4w9WgXcQ", "text": "We're no strangers to love"}"#;

        let (code, _) = run_with_input(
            &cache,
            Command::Set {
                id: "dQw4w9WgXcQ".to_string(),
                file: None,
            },
            transcript,
        );
        assert_eq!(code, Outcome::Done);

        let (code, out) = run_command(
            &cache,
            Command::Get {
                id: "dQw4w9WgXcQ".to_string(),
            },
        );
        assert_eq!(code, Outcome::Done);
        let printed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(printed, serde_json::from_str::<Value>(transcript).unwrap());
    }

    #[test]
    fn test_set_from_file() {
        let (dir, cache) = open_cache();
        let path = dir.path().join("input.txt");
        fs::write(&path, br#"{"segments": []}"#).unwrap();

        run_command(
            &cache,
            Command::Set {
                id: "vid".to_string(),
                file: Some(path),
            },
        );
        assert_eq!(
            cache.get::<Value>("vid"),
            Some(serde_json::json!({"segments": []}))
        );
    }

    #[test]
    fn test_set_rejects_invalid_json() {
        let (_dir, cache) = open_cache();
        let mut out = Vec::new();
        let result = run(
            Command::Set {
                id: "vid".to_string(),
                file: None,
            },
            &cache,
            &mut "not json".as_bytes(),
            &mut out,
        );
        assert!(matches!(result, Err(CliError::Json(_))));
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_get_miss_reports_not_found() {
        let (_dir, cache) = open_cache();
        let (code, out) = run_command(
            &cache,
            Command::Get {
                id: "missing".to_string(),
            },
        );
        assert_eq!(code, Outcome::NotFound);
        assert!(out.is_empty());
    }

    #[test]
    fn test_delete_and_clear() {
        let (_dir, cache) = open_cache();
        cache.set("a", &serde_json::json!("first")).unwrap();
        cache.set("b", &serde_json::json!("second")).unwrap();

        run_command(&cache, Command::Delete { id: "a".to_string() });
        assert_eq!(cache.stats().entries, 1);

        run_command(&cache, Command::Clear);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_list() {
        let (_dir, cache) = open_cache();
        cache.set("dQw4w9WgXcQ", &serde_json::json!("lyrics")).unwrap();

        let (_, out) = run_command(&cache, Command::List);
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with(&derive_key("dQw4w9WgXcQ")));
        assert!(out.trim_end().ends_with("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_stats_json() {
        let (_dir, cache) = open_cache();
        cache.set("vid", &serde_json::json!("abc")).unwrap();

        let (_, out) = run_command(&cache, Command::Stats { json: true });
        let stats: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(stats["entries"], 1);
        assert_eq!(stats["total_size"], 5);
        assert_eq!(stats["max_age_secs"], 3600);
    }

    #[test]
    fn test_stats_text() {
        let (_dir, cache) = open_cache();
        let (_, out) = run_command(&cache, Command::Stats { json: false });
        assert!(out.starts_with("Cache Statistics:"));
        assert!(out.contains("- Total transcripts cached: 0"));
    }

    #[test]
    fn test_key() {
        let (_dir, cache) = open_cache();
        let (_, out) = run_command(
            &cache,
            Command::Key {
                id: "dQw4w9WgXcQ".to_string(),
            },
        );
        assert_eq!(out.trim(), derive_key("dQw4w9WgXcQ"));
    }
}
