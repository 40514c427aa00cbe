//! Pairs command.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use lowlight_eval::corpus::correspondence;
use lowlight_eval::{Error, ImageKey, ImageSet};

pub fn run(input: PathBuf, output: PathBuf) -> Result<ExitCode> {
    let before = ImageSet::load(&input)
        .with_context(|| format!("Failed to load input set {}", input.display()))?;
    let after = ImageSet::load(&output)
        .with_context(|| format!("Failed to load output set {}", output.display()))?;

    print_set("Input", &before);
    println!();
    print_set("Output", &after);
    println!();

    match correspondence::validate(&before.key_set(), &after.key_set()) {
        Ok(()) => {
            println!("All {} keys correspond.", before.len());
            Ok(ExitCode::SUCCESS)
        }
        Err(Error::Correspondence {
            missing_from_output,
            missing_from_input,
        }) => {
            print_keys("Missing from output", &missing_from_output);
            print_keys("Missing from input", &missing_from_input);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_set(label: &str, set: &ImageSet) {
    println!("{} set: {} ({} keys)", label, set.root().display(), set.len());
    for (key, image) in set.iter() {
        let (height, width, _) = image.shape();
        println!("  {:<24} {} ({}x{})", key.as_str(), image.file_name(), width, height);
    }
    for collision in set.collisions() {
        println!(
            "  collision {}: kept {}, replaced {}",
            collision.key,
            collision.kept.display(),
            collision.replaced.display()
        );
    }
    for skipped in set.skipped() {
        println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
    }
}

fn print_keys(label: &str, keys: &[ImageKey]) {
    if keys.is_empty() {
        return;
    }
    println!("{} ({}):", label, keys.len());
    for key in keys {
        println!("  {key}");
    }
}
