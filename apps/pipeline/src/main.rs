use std::{
    io::{self, Write},
    path::PathBuf,
    thread,
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use reducer_core::{
    connect, deliver, drive, spawn_linked, ActorOptions, CollectingSink, CounterReducer, Glyph,
    OutputSink, Pipeline, ReducerExt, ReducerWorker, ScalarDisplay, SyncSinkAdapter, WriterSink,
};
use serde::Serialize;
use shared::{
    domain::{ExecutionMode, Message},
    protocol::{demo_script, read_script, render_script},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings_from, parse_placeholder, Settings};

/// Runs a message script through a counter reducer and prints each emitted
/// value as a character.
#[derive(Parser, Debug)]
#[command(name = "reducer-pipeline")]
struct Cli {
    /// Script to run; the built-in demo statements are used when omitted.
    #[arg(long)]
    script: Option<PathBuf>,
    #[arg(long, default_value = "reducer.toml")]
    config: PathBuf,
    #[arg(long)]
    mode: Option<ExecutionMode>,
    /// Single character or `U+XXXX` used for values without a character.
    #[arg(long)]
    placeholder: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    initial_state: Option<i64>,
    /// Print the parsed script instead of running it.
    #[arg(long)]
    dump: bool,
    /// Print a JSON report instead of one character per line.
    #[arg(long)]
    json: bool,
}

#[derive(Debug)]
struct RunOutcome {
    mode: ExecutionMode,
    messages: usize,
    glyphs: Vec<Glyph>,
}

#[derive(Debug, Serialize)]
struct RunReport {
    mode: ExecutionMode,
    messages: usize,
    emitted: usize,
    substituted: usize,
    outputs: Vec<GlyphReport>,
}

#[derive(Debug, Serialize)]
struct GlyphReport {
    code: i64,
    rendered: String,
    substituted: bool,
}

impl From<&RunOutcome> for RunReport {
    fn from(outcome: &RunOutcome) -> Self {
        Self {
            mode: outcome.mode,
            messages: outcome.messages,
            emitted: outcome.glyphs.len(),
            substituted: outcome.glyphs.iter().filter(|g| g.substituted).count(),
            outputs: outcome
                .glyphs
                .iter()
                .map(|glyph| GlyphReport {
                    code: glyph.code,
                    rendered: glyph.rendered.to_string(),
                    substituted: glyph.substituted,
                })
                .collect(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    let filter = EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let messages = load_messages(&cli)?;

    if cli.dump {
        print!("{}", render_script(&messages));
        return Ok(());
    }

    let outcome = run_script(&settings, messages).await?;
    info!(
        mode = %outcome.mode,
        messages = outcome.messages,
        emitted = outcome.glyphs.len(),
        "script finished"
    );

    let stdout = io::stdout();
    if cli.json {
        let report = RunReport::from(&outcome);
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &report).context("failed to write report")?;
        writeln!(out).context("failed to write report")?;
    } else {
        let mut sink = WriterSink::new(stdout.lock());
        for glyph in outcome.glyphs {
            sink.accept(glyph);
        }
    }

    Ok(())
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = load_settings_from(&cli.config);
    if let Some(mode) = cli.mode {
        settings.mode = mode;
    }
    if let Some(raw) = &cli.placeholder {
        settings.placeholder = parse_placeholder(raw)
            .ok_or_else(|| anyhow!("invalid placeholder '{raw}': expected one character or U+XXXX"))?;
    }
    if let Some(initial) = cli.initial_state {
        settings.initial_state = initial;
    }
    Ok(settings)
}

fn load_messages(cli: &Cli) -> Result<Vec<Message>> {
    match &cli.script {
        // The script error already names the file.
        Some(path) => read_script(path).context("failed to load script"),
        None => Ok(demo_script()),
    }
}

async fn run_script(settings: &Settings, messages: Vec<Message>) -> Result<RunOutcome> {
    let count = messages.len();
    let glyphs = match settings.mode {
        ExecutionMode::Sync => run_sync(settings, messages),
        ExecutionMode::Actor => run_actors(settings, messages).await?,
        ExecutionMode::Worker => {
            let settings = settings.clone();
            tokio::task::spawn_blocking(move || run_worker(&settings, messages))
                .await
                .context("worker runner task failed")??
        }
    };

    Ok(RunOutcome {
        mode: settings.mode,
        messages: count,
        glyphs,
    })
}

fn run_sync(settings: &Settings, messages: Vec<Message>) -> Vec<Glyph> {
    let reducer = CounterReducer::with_initial(settings.initial_state)
        .chain(ScalarDisplay::with_placeholder(settings.placeholder));
    let mut pipeline = Pipeline::new(reducer, CollectingSink::<Glyph>::new());
    pipeline.run(messages);
    pipeline.into_parts().1.into_inner()
}

/// Counter and display stage each run in their own task, linked through
/// their outboxes by a forwarder.
async fn run_actors(settings: &Settings, messages: Vec<Message>) -> Result<Vec<Glyph>> {
    let options = ActorOptions {
        queue_capacity: settings.queue_capacity,
        output_capacity: settings.output_capacity,
    };
    let (counter, counter_outbox) =
        spawn_linked(CounterReducer::with_initial(settings.initial_state), options);
    let (display, display_outbox) =
        spawn_linked(ScalarDisplay::with_placeholder(settings.placeholder), options);

    let delivery = tokio::spawn(deliver(
        display_outbox,
        SyncSinkAdapter(CollectingSink::<Glyph>::new()),
    ));
    let forwarder = connect(counter_outbox, display.clone());

    drive(&counter, futures::stream::iter(messages)).await?;
    let counter_report = counter.finish().await?;
    let forwarded = forwarder.await.context("forwarder task failed")?;
    let display_report = display.finish().await?;
    info!(
        counter = %counter_report.id,
        display = %display_report.id,
        forwarded,
        "actor pipeline drained"
    );

    let sink = delivery.await.context("output delivery task failed")?;
    Ok(sink.into_inner().into_inner())
}

fn run_worker(settings: &Settings, messages: Vec<Message>) -> Result<Vec<Glyph>> {
    let reducer = CounterReducer::with_initial(settings.initial_state)
        .chain(ScalarDisplay::with_placeholder(settings.placeholder));
    let (worker, outputs) = ReducerWorker::launch(reducer, settings.queue_capacity)?;
    let collector = thread::Builder::new()
        .name("output-collector".into())
        .spawn(move || outputs.iter().collect::<Vec<Glyph>>())
        .context("failed to start output collector")?;
    for message in messages {
        worker.send(message)?;
    }
    let report = worker.shutdown()?;
    info!(worker = %report.id, handled = report.handled, "worker drained");
    collector
        .join()
        .map_err(|_| anyhow!("output collector panicked"))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
