use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use quickapply::anthropic::AnthropicClient;
use quickapply::cli::{Cli, Command};
use quickapply::config::{CoverLetterFallback, SessionConfig};
use quickapply::cover_letter::{AnthropicCoverLetter, CoverLetterRequest, TextGenerator, Unavailable};
use quickapply::demo::{demo_policy, demo_profile, demo_script};
use quickapply::enumerator::JobEnumerator;
use quickapply::logging;
use quickapply::orchestrator::Orchestrator;
use quickapply::posting::JobPosting;
use quickapply::rate_limit::{RateBudget, RateLimiter};
use quickapply::recorder::JsonlRecorder;
use quickapply::resolver::FieldResolver;
use quickapply::scripted::{ListingScript, ScriptedSurface};
use quickapply::state_machine::{AttemptContext, MachineSettings};
use quickapply::ui::{ConsoleRecorder, print_summary};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = SessionConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    logging::init(&config.log_level)?;

    match cli.command {
        Command::Demo { real_pacing } => {
            if config.profile.full_name.trim().is_empty() {
                config.profile = demo_profile();
                config.fields = demo_policy();
            }
            if config.cover_letter.fallback == CoverLetterFallback::None {
                config.cover_letter.fallback = CoverLetterFallback::Template;
            }
            if !real_pacing {
                shorten_pacing(&mut config);
            }
            config.recorder.path = config.recorder.demo_path();
            run_session(&config, demo_script(), false).await
        }
        Command::Replay {
            fixture,
            real_pacing,
        } => {
            let script = ListingScript::from_json_file(&fixture)
                .with_context(|| format!("loading listing script {}", fixture.display()))?;
            if !real_pacing {
                shorten_pacing(&mut config);
            }
            run_session(&config, script, true).await
        }
        Command::CoverLetter {
            title,
            company,
            description,
        } => {
            write_cover_letter(&config, title, company, description).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn shorten_pacing(config: &mut SessionConfig) {
    config.pacing.wait_min_secs = 1;
    config.pacing.wait_max_secs = 2;
}

fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping session");
            trigger.cancel();
        }
    });
    cancel
}

fn anthropic_generator(config: &SessionConfig) -> Result<AnthropicCoverLetter<AnthropicClient>> {
    let client = AnthropicClient::new(config.api_key.clone(), config.cover_letter.timeout())?;
    Ok(AnthropicCoverLetter::new(
        client,
        config.cover_letter.model.clone(),
        config.cover_letter.max_tokens,
    ))
}

async fn run_session(config: &SessionConfig, script: ListingScript, resume: bool) -> Result<ExitCode> {
    let cancel = cancel_on_interrupt();
    if !config.cover_letter.enabled {
        let generator = Unavailable("cover letter generation is disabled".into());
        return session(config, &generator, script, resume, &cancel).await;
    }
    if config.api_key.is_empty() {
        tracing::warn!("cover letters enabled but ANTHROPIC_API_KEY is not set");
        let generator = Unavailable("no API key".into());
        return session(config, &generator, script, resume, &cancel).await;
    }
    let generator = anthropic_generator(config)?;
    session(config, &generator, script, resume, &cancel).await
}

async fn session<G: TextGenerator>(
    config: &SessionConfig,
    generator: &G,
    script: ListingScript,
    resume: bool,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    let settings = MachineSettings::from_config(config);
    let resolver = FieldResolver::new(config.fields.clone());
    let ctx = AttemptContext {
        generator,
        resolver: &resolver,
        profile: &config.profile,
        settings: &settings,
        cancel,
    };

    let jsonl = JsonlRecorder::new(&config.recorder.path);
    let mut enumerator = JobEnumerator::new(
        config.search.to_query(),
        config.retry.enumeration,
        config.timeouts.listing(),
    );
    if resume {
        let recorded = jsonl.recorded_ids()?;
        tracing::info!(recorded = recorded.len(), path = %jsonl.path().display(), "resuming session");
        enumerator = enumerator.resume(recorded);
    }

    let mut surface = ScriptedSurface::new(script);
    let mut recorder = ConsoleRecorder::new(jsonl);
    let mut orchestrator = Orchestrator::new(
        ctx,
        RateBudget::from_pacing(&config.pacing),
        RateLimiter::new(config.pacing.skip_initial_wait),
    );
    let result = orchestrator
        .run(&mut surface, &mut enumerator, &mut recorder)
        .await;
    recorder.finish();

    let report = result?;
    print_summary(&report);
    Ok(if report.is_abnormal() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn write_cover_letter(
    config: &SessionConfig,
    title: String,
    company: String,
    description: String,
) -> Result<()> {
    if config.api_key.is_empty() {
        bail!("ANTHROPIC_API_KEY is not set");
    }
    let generator = anthropic_generator(config)?;
    let posting = JobPosting {
        id: "adhoc".into(),
        title,
        company,
        location: String::new(),
        description,
        link: String::new(),
        quick_apply: true,
    };
    let request =
        CoverLetterRequest::for_posting(&posting, &config.profile, config.cover_letter.excerpt_chars);
    let text = generator
        .generate(&request, config.cover_letter.timeout())
        .await?;
    println!("{text}");
    Ok(())
}
