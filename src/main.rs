use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::process;
use std::time::Duration;

use page_mirror::cli::MirrorCommand;
use page_mirror::logging::init_logger;
use page_mirror::{FileManager, WebsiteMirror};

#[tokio::main]
async fn main() -> Result<()> {
    let args = MirrorCommand::parse();
    init_logger(args.log_level.into()).context("Failed to initialize logger")?;

    let mirror = match WebsiteMirror::new(&args.url, &args.output_dir, args.options()) {
        Ok(mirror) => mirror,
        Err(e) => {
            eprintln!("{} {}", "❌ Invalid URL:".red(), e);
            process::exit(1);
        }
    };

    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    progress_bar.enable_steady_tick(Duration::from_millis(100));
    progress_bar.set_message(format!("Mirroring {}", mirror.base_url()));

    let result = mirror.run().await;
    progress_bar.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", "=".repeat(50));
        println!("{}", "MIRROR SUMMARY".bold());
        println!("{}", "=".repeat(50));
        for line in result.summary_lines() {
            println!("{}", line);
        }

        if result.root_failure.is_none() {
            if let Ok(files) = FileManager::new(&args.output_dir).and_then(|m| m.list_files()) {
                println!("\n📁 {}", args.output_dir.display());
                for file in files {
                    println!("   {} ({})", file.path, file.display_size);
                }
            }
        }

        if result.is_complete() {
            println!("{}", "✅ Page mirrored successfully!".green());
        } else {
            println!("{}", "⚠️  Page mirrored with errors".yellow());
        }
    }

    if result.root_failure.is_some() || (args.strict && !result.is_complete()) {
        process::exit(2);
    }
    Ok(())
}
