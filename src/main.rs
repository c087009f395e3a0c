use std::sync::Arc;

use anyhow::Context;

use sanitize_csl::{
    Cli, Collation, EngineConfig, FileConfig, FileDiscovery, HayagrivaChecker, Output,
    ProgressCallback, RunConfig, SanitizeEngine, SanitizePhase, StyleChecker, SystemEnvProvider,
    apply_env, make_human_index, make_json_index, sort_entries,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    if let Err(message) = cli.validate() {
        eprintln!("Error: {message}");
        std::process::exit(2);
    }

    let mut run = RunConfig::from_cli(&cli);
    if let Some(config_path) = &cli.config {
        let file_config = FileConfig::load(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        file_config.apply_to(&mut run);
    }
    apply_env(&mut run, &SystemEnvProvider)?;

    let discovery = FileDiscovery::new()
        .with_extensions(run.extensions.clone())
        .with_include_patterns(run.include_patterns.clone())?
        .with_exclude_patterns(run.exclude_patterns.clone())?;

    let checker: Option<Arc<dyn StyleChecker>> = if run.check {
        Some(Arc::new(HayagrivaChecker::new(
            run.checker_command.clone(),
            run.references.clone(),
        )))
    } else {
        None
    };

    let engine = SanitizeEngine::new(
        checker,
        run.styles_dir.clone(),
        run.out_dir.clone(),
        EngineConfig {
            max_concurrent: run.threads,
            fail_fast: run.fail_fast,
            backtrace: run.backtrace,
        },
    );

    let progress: Option<ProgressCallback> = if run.progress {
        Some(Arc::new(|update| {
            if update.phase == SanitizePhase::Sanitizing {
                eprintln!(
                    "[{}/{}] {}",
                    update.completed,
                    update.total,
                    update
                        .current_file
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default()
                );
            }
        }))
    } else {
        None
    };

    let results = engine
        .sanitize_path(&run.styles_dir, &discovery, progress)
        .await?;

    // Batch indices over everything that produced an entry.
    let mut entries = results.index_entries();
    sort_entries(&mut entries, Collation::Codepoint);
    tokio::fs::create_dir_all(&run.out_dir).await?;
    tokio::fs::write(
        run.out_dir.join("index.html"),
        make_human_index(&entries, &run.out_dir)?,
    )
    .await?;
    tokio::fs::write(
        run.out_dir.join("index.json"),
        make_json_index(&entries, &run.out_dir)?,
    )
    .await?;

    let output = Output::new(run.verbosity());
    print!("{}", output.format_results(&results));

    if results.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
