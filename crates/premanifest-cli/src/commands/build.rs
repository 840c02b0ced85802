use super::{json_pretty, spin_fail, spin_ok, spinner, Context, EXIT_FAILURE, EXIT_SUCCESS};
use indicatif::ProgressBar;
use premanifest_core::{BuildInput, BuildObserver, BuildOptions, BuildStage};
use premanifest_tools::{check_signing_prereqs, format_missing};
use std::path::{Path, PathBuf};
use tracing::debug;

fn labels(stage: BuildStage) -> (&'static str, &'static str) {
    match stage {
        BuildStage::Compile => ("compiling manifest...", "manifest compiled"),
        BuildStage::Sign => ("signing enclave...", "enclave signed"),
        BuildStage::Token => ("fetching launch token...", "launch token written"),
        BuildStage::Finalize => ("renaming signed manifest...", "signed manifest in place"),
    }
}

/// One spinner per build stage. Silent in JSON mode.
struct StageSpinners {
    enabled: bool,
    current: Option<ProgressBar>,
}

impl BuildObserver for StageSpinners {
    fn started(&mut self, stage: BuildStage) {
        if self.enabled {
            self.current = Some(spinner(labels(stage).0));
        }
    }

    fn finished(&mut self, stage: BuildStage, ok: bool) {
        let Some(pb) = self.current.take() else {
            return;
        };
        let (running, done) = labels(stage);
        if ok {
            spin_ok(&pb, done);
        } else {
            spin_fail(&pb, running.trim_end_matches('.'));
        }
    }
}

pub fn run(
    ctx: &Context,
    input: BuildInput,
    key: &Path,
    outdir: Option<PathBuf>,
) -> Result<u8, String> {
    let builder = ctx.builder()?;

    if std::env::var("PREMANIFEST_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = check_signing_prereqs(builder.tools().config());
        if !missing.is_empty() {
            eprintln!("error: {}", format_missing(&missing));
            return Ok(EXIT_FAILURE);
        }
    }

    debug!(
        "build outputs in {}",
        outdir
            .as_deref()
            .map_or_else(|| ".".to_owned(), |d| d.display().to_string())
    );
    let options = BuildOptions {
        input,
        key: key.to_path_buf(),
        outdir,
    };
    let mut spinners = StageSpinners {
        enabled: !ctx.json,
        current: None,
    };
    let result = builder
        .build_with(&options, &mut spinners)
        .map_err(|e| e.to_string())?;

    if ctx.json {
        println!("{}", json_pretty(&result)?);
    } else {
        println!("signed manifest: {}", result.signed_manifest.display());
        println!("token: {}", result.token.display());
        if let Some(digest) = &result.digest {
            println!("manifest digest: {digest}");
        }
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_mode_draws_no_spinners() {
        let mut spinners = StageSpinners {
            enabled: false,
            current: None,
        };
        spinners.started(BuildStage::Sign);
        assert!(spinners.current.is_none());
        spinners.finished(BuildStage::Sign, true);
    }

    #[test]
    fn every_stage_has_distinct_labels() {
        let stages = [
            BuildStage::Compile,
            BuildStage::Sign,
            BuildStage::Token,
            BuildStage::Finalize,
        ];
        for (i, a) in stages.iter().enumerate() {
            let (running, done) = labels(*a);
            assert!(running.ends_with("..."));
            assert!(!done.is_empty());
            for b in &stages[i + 1..] {
                assert_ne!(labels(*a), labels(*b));
            }
        }
    }
}
