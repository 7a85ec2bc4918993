//! Command-line interface for eventkit
//!
//! # Usage Examples
//!
//! ```bash
//! # Print a rendered template
//! eventkit render --payload 'Hello {{var:who}}' --template-var who=world
//!
//! # Print a random sentence every 500ms
//! eventkit send stdout --payload '{{sentence}}' --interval 500ms
//!
//! # Deterministic payloads with custom delimiters
//! eventkit send file --path out.log --seed 42 \
//!   --template-open '<<' --template-close '>>' --payload '<<json>>' --once
//!
//! # Multipart upload with an interpolated form field
//! eventkit send http --file doc=./report.pdf --form-field 'id={{counter}}' --once
//!
//! # Read part of the body from disk
//! eventkit send http --allow-file-reads --file-root ./fixtures \
//!   --payload '{"doc":{{str:file:fixtures/doc.txt}}}'
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use eventkit::form::build_form;
use eventkit::payload::{build_payload, parse_headers};
use eventkit::template::{Delimiters, TemplateEngine};
use eventkit::schedule::{parse_interval, run_once_or_periodic, shutdown_signal};
use eventkit::sink::{FileSink, HttpSink, Message, Sink, StdoutSink};
use eventkit::{FormArgs, HeaderArgs, PayloadArgs, ScheduleArgs, TemplateArgs};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "eventkit")]
#[command(about = "Generate templated test payloads and send them to a destination")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a payload template once and print it
    Render {
        #[command(flatten)]
        template: TemplateArgs,

        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Send rendered payloads to a destination
    Send {
        #[command(subcommand)]
        target: SendTarget,
    },
}

/// Destination for `send`
#[derive(Subcommand)]
enum SendTarget {
    /// Print each message on stdout
    Stdout {
        #[command(flatten)]
        common: SendArgs,
    },
    /// Append each message to a file
    File {
        /// Output file path
        #[arg(long)]
        path: PathBuf,

        #[command(flatten)]
        common: SendArgs,
    },
    /// Send each message as an HTTP request body
    Http {
        /// Server address
        #[arg(long, default_value = "http://localhost:8080", env = "EVENTKIT_HTTP_ADDRESS")]
        address: String,

        /// Request path
        #[arg(long, default_value = "/event")]
        path: String,

        /// HTTP method
        #[arg(long, default_value = "POST")]
        method: String,

        #[command(flatten)]
        form: FormArgs,

        #[command(flatten)]
        common: SendArgs,
    },
}

#[derive(clap::Args)]
struct SendArgs {
    #[command(flatten)]
    template: TemplateArgs,

    #[command(flatten)]
    payload: PayloadArgs,

    #[command(flatten)]
    schedule: ScheduleArgs,

    #[command(flatten)]
    headers: HeaderArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { template, payload } => run_render(template, payload),
        Commands::Send { target } => match target {
            SendTarget::Stdout { common } => {
                run_send(Arc::new(StdoutSink::new()), common, FormArgs::default()).await
            }
            SendTarget::File { path, common } => {
                run_send(Arc::new(FileSink::new(path)), common, FormArgs::default()).await
            }
            SendTarget::Http {
                address,
                path,
                method,
                form,
                common,
            } => {
                let sink = HttpSink::new(&address, &path, &method)?;
                tracing::info!("Sending to {} {}", sink.method(), sink.url());
                run_send(Arc::new(sink), common, form).await
            }
        },
    }
}

fn run_render(template: TemplateArgs, payload: PayloadArgs) -> anyhow::Result<()> {
    let engine = template.build_engine()?;
    let delims = template.delimiters()?;
    let built = build_payload(&engine, &payload.payload, &payload.mime, &delims)?;

    tracing::debug!("Rendered {} bytes as {}", built.body.len(), built.content_type);

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&built.body)
        .and_then(|()| stdout.write_all(b"\n"))
        .context("Failed to write to stdout")?;
    Ok(())
}

/// Build one message: a multipart form when form flags are given, else the
/// rendered payload.
fn build_message(
    engine: &TemplateEngine,
    delims: &Delimiters,
    payload: &PayloadArgs,
    form: &FormArgs,
) -> anyhow::Result<Message> {
    if form.is_multipart() {
        let data = build_form(engine, &form.form_fields, &form.files, delims)?;
        return Ok(Message::multipart(data));
    }
    let built = build_payload(engine, &payload.payload, &payload.mime, delims)?;
    Ok(Message::new(built.body, built.content_type))
}

async fn run_send(sink: Arc<dyn Sink>, args: SendArgs, form: FormArgs) -> anyhow::Result<()> {
    let engine = Arc::new(args.template.build_engine()?);
    let delims = Arc::new(args.template.delimiters()?);
    let interval = parse_interval(&args.schedule.interval)
        .with_context(|| format!("Invalid --interval '{}'", args.schedule.interval))?;
    let inputs = Arc::new((args.payload, form));
    let headers = Arc::new(
        parse_headers(&engine, &args.headers.headers, &delims).context("Invalid --header")?,
    );

    if !args.schedule.once {
        tracing::info!(
            "Publishing to {} every {:?}, press Ctrl+C to stop",
            sink.name(),
            interval
        );
    }

    let shutdown = shutdown_signal();
    run_once_or_periodic(shutdown, args.schedule.once, interval, move || {
        let sink = sink.clone();
        let engine = engine.clone();
        let delims = delims.clone();
        let inputs = inputs.clone();
        let headers = headers.clone();
        async move {
            let (payload, form) = &*inputs;
            let message =
                build_message(&engine, &delims, payload, form)?.with_headers((*headers).clone());
            sink.send(&message)
                .await
                .with_context(|| format!("Failed to publish to {}", sink.name()))?;
            tracing::info!(
                "Published {} bytes ({}) to {}",
                message.size(),
                message.content_type,
                sink.name()
            );
            Ok::<(), anyhow::Error>(())
        }
    })
    .await
}
