//! Model staging helper for nutriassist.
//!
//! Checks that the classifier model sits under the expected file name and,
//! if it does not, copies one of the `.keras`/`.h5` files found next to it.
//!
//! Usage:
//! ```bash
//! # Report on ./best_food_effnet.keras
//! cargo run --bin stage-model
//!
//! # Stage the second model found in ./models
//! cargo run --bin stage-model -- --dir models --pick 2
//!
//! # Replace an existing target, keeping it as backup_<name>
//! cargo run --bin stage-model -- --pick 1 --force
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::Parser;

const MODEL_EXTENSIONS: [&str; 2] = ["keras", "h5"];
const CLASS_NAMES_FILE: &str = "class_names.txt";

#[derive(Parser)]
#[command(
    name = "stage-model",
    about = "Stage the food classifier model under the name the service expects"
)]
struct StageArgs {
    /// Directory holding the model files
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// File name the service loads
    #[arg(long, default_value = "best_food_effnet.keras")]
    target: String,

    /// 1-based index of the candidate to copy (first by default)
    #[arg(long)]
    pick: Option<usize>,

    /// Overwrite an existing target, moving it to backup_<name>
    #[arg(long)]
    force: bool,
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Present { size_bytes: u64, class_names: Option<usize> },
    Staged { from: PathBuf, backup: Option<PathBuf> },
}

fn is_model_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MODEL_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Model files in `dir` other than the target, sorted by name.
fn list_candidates(dir: &Path, target: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for item in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = item?.path();
        let is_target = path.file_name().and_then(|n| n.to_str()) == Some(target);
        if path.is_file() && is_model_file(&path) && !is_target {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

fn count_class_names(dir: &Path) -> Result<Option<usize>> {
    let path = dir.join(CLASS_NAMES_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Some(text.lines().filter(|l| !l.trim().is_empty()).count()))
}

fn stage(args: &StageArgs) -> Result<Outcome> {
    let target = args.dir.join(&args.target);
    if target.is_file() && !args.force {
        return Ok(Outcome::Present {
            size_bytes: fs::metadata(&target)?.len(),
            class_names: count_class_names(&args.dir)?,
        });
    }

    let candidates = list_candidates(&args.dir, &args.target)?;
    if candidates.is_empty() {
        bail!("no .keras or .h5 files found in {}", args.dir.display());
    }
    let pick = args.pick.unwrap_or(1);
    let Some(from) = pick.checked_sub(1).and_then(|i| candidates.get(i)) else {
        bail!("--pick must be between 1 and {}", candidates.len());
    };

    let backup = args.dir.join(format!("backup_{}", args.target));
    let backup = install(from, &target, &backup)?;
    Ok(Outcome::Staged {
        from: from.clone(),
        backup,
    })
}

/// Copies `from` next to `target` first, then swaps it in. An existing
/// target moves to `backup` only once the copy is complete.
fn install(from: &Path, target: &Path, backup: &Path) -> Result<Option<PathBuf>> {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .context("target has no file name")?;
    let partial = target.with_file_name(format!(".{name}.partial"));
    if let Err(e) = fs::copy(from, &partial) {
        let _ = fs::remove_file(&partial);
        return Err(e).with_context(|| format!("copying {} to {}", from.display(), partial.display()));
    }

    let moved = if target.is_file() {
        fs::rename(target, backup).with_context(|| format!("moving {} aside", target.display()))?;
        Some(backup.to_path_buf())
    } else {
        None
    };
    if let Err(e) = fs::rename(&partial, target) {
        if moved.is_some() {
            let _ = fs::rename(backup, target);
        }
        return Err(e).with_context(|| format!("moving {} into place", partial.display()));
    }
    Ok(moved)
}

fn main() -> Result<()> {
    let args = StageArgs::parse();

    let candidates = list_candidates(&args.dir, &args.target)?;
    println!("Model files in {}:", args.dir.display());
    for (i, path) in candidates.iter().enumerate() {
        println!("  {}. {}", i + 1, path.display());
    }

    match stage(&args)? {
        Outcome::Present { size_bytes, class_names } => {
            println!("Found {} ({:.1} MB)", args.target, size_bytes as f64 / (1024.0 * 1024.0));
            match class_names {
                Some(n) => println!("Class names: {n} foods"),
                None => println!("Class names: {CLASS_NAMES_FILE} not found"),
            }
        }
        Outcome::Staged { from, backup } => {
            if let Some(b) = backup {
                println!("Previous model kept as {}", b.display());
            }
            println!("Copied {} to {}", from.display(), args.target);
        }
    }
    Ok(())
}
