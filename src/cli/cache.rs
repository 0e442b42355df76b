// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Cache command - manage the artifact store

use colored::Colorize;
use miette::Result;
use std::io::{self, Write};
use std::path::PathBuf;

use super::{open_store, CacheAction};
use crate::cache::Cache;
use crate::utils::create_spinner;

/// Run the cache command
pub async fn run(pipeline_path: PathBuf, action: CacheAction, _verbose: bool) -> Result<()> {
    let store = open_store(&pipeline_path);

    match action {
        CacheAction::Stats => {
            let stats = store.stats().await?;
            let built = store.manifest()?.len();

            println!("{}", "Cache Statistics".bold());
            println!("{}", "═".repeat(40));
            println!("  Location: {}", store.root().display());
            println!("  Entries:  {}", stats.entries);
            println!("  Current:  {} step(s) in the manifest", built);
            println!("  Size:     {}", stats.formatted_size());

            if let Some(oldest) = stats.oldest_entry {
                if let Ok(duration) = oldest.elapsed() {
                    println!("  Oldest:   {} ago", format_duration(duration));
                }
            }

            if let Some(newest) = stats.newest_entry {
                if let Ok(duration) = newest.elapsed() {
                    println!("  Newest:   {} ago", format_duration(duration));
                }
            }

            Ok(())
        }

        CacheAction::Clear { yes } => {
            let stats = store.stats().await?;

            if stats.entries == 0 {
                println!("{}", "Cache is already empty.".dimmed());
                return Ok(());
            }

            if !yes {
                print!(
                    "Clear {} cache entries ({})? [y/N] ",
                    stats.entries,
                    stats.formatted_size()
                );
                io::stdout().flush().ok();

                let mut input = String::new();
                io::stdin().read_line(&mut input).ok();

                if !input.trim().eq_ignore_ascii_case("y") {
                    println!("{}", "Cancelled.".dimmed());
                    return Ok(());
                }
            }

            let spinner = create_spinner("Clearing artifact store...");
            let cleared = store.clear().await;
            spinner.finish_and_clear();
            cleared?;
            println!("{}", "Cache cleared.".green());

            Ok(())
        }

        CacheAction::List => {
            let entries = store.list_entries()?;
            let manifest = store.manifest()?;

            println!("{}", "Cached Entries".bold());
            println!("{}", "═".repeat(40));

            if entries.is_empty() {
                println!("{}", "  No cached entries.".dimmed());
                return Ok(());
            }

            for entry in &entries {
                let current = manifest
                    .get(&entry.step_name)
                    .is_some_and(|m| m.key == entry.cache_key);
                let marker = if current { "●".green() } else { "○".dimmed() };
                let age = entry
                    .timestamp
                    .elapsed()
                    .map(format_duration)
                    .unwrap_or_else(|_| "?".to_string());

                println!(
                    "  {} {:<24} {:<18} {}  {}",
                    marker,
                    entry.step_name,
                    entry.kind.to_string(),
                    &entry.cache_key[..12.min(entry.cache_key.len())],
                    format!("{} ago", age).dimmed()
                );
            }

            println!();
            println!(
                "{}",
                "  ● current build   ○ superseded (kept until 'svmflow cache clear')".dimmed()
            );

            Ok(())
        }
    }
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}
