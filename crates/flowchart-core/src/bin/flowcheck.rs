#[cfg(feature = "cli")]
mod real {
    use std::io::{self, Read, Write};
    use std::path::PathBuf;

    use anyhow::{Context, Result, bail};
    use clap::{Parser, Subcommand};
    use flowchart_core::{FlowchartConfig, Pipeline};
    use serde::Serialize;
    use tracing::{debug, info};

    /// Decode, extract and check draw.io flowcharts.
    #[derive(Debug, Parser)]
    #[command(name = "flowcheck", version)]
    struct Cli {
        #[command(subcommand)]
        command: Command,

        /// More logging (-v, -vv, -vvv)
        #[arg(short, long, action = clap::ArgAction::Count, global = true)]
        verbose: u8,

        /// Only log errors
        #[arg(short, long, global = true)]
        quiet: bool,

        /// TOML file overriding the default thresholds
        #[arg(long, global = true)]
        config: Option<PathBuf>,
    }

    #[derive(Debug, Subcommand)]
    enum Command {
        /// Print the diagram as plain XML.
        Decode {
            #[arg(default_value = "-")]
            input: String,
        },
        /// Print the extracted nodes and edges as JSON.
        Extract {
            #[arg(default_value = "-")]
            input: String,
        },
        /// Print the structural analysis.
        Analyze {
            #[arg(default_value = "-")]
            input: String,

            /// One issue per line instead of JSON
            #[arg(long)]
            text: bool,
        },
        /// Print rule findings followed by feedback messages.
        Assess {
            #[arg(default_value = "-")]
            input: String,

            /// Findings and feedback as one JSON document
            #[arg(long)]
            json: bool,
        },
    }

    fn init_tracing(verbose: u8, quiet: bool) {
        let filter = if quiet {
            "error"
        } else {
            match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .without_time()
            .try_init();
    }

    /// Stdin is read once. A file is read through the capture, so a file
    /// caught mid-save gets one retry after the configured delay.
    fn load_input(pipeline: &Pipeline, input: &str) -> Result<String> {
        if input == "-" {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read from stdin")?;
            return Ok(buffer);
        }

        let mut failure = None;
        let mut read = || match std::fs::read_to_string(input) {
            Ok(text) => Some(text),
            Err(err) => {
                failure = Some(err);
                None
            }
        };
        match (pipeline.capture(&mut read), failure) {
            (Some(text), _) => Ok(text),
            (None, Some(err)) => Err(err).with_context(|| format!("failed to read {input}")),
            (None, None) => bail!("{input} holds no diagram text"),
        }
    }

    fn load_config(path: Option<&PathBuf>) -> Result<FlowchartConfig> {
        match path {
            Some(path) => FlowchartConfig::from_path(path)
                .with_context(|| format!("failed to load config {}", path.display())),
            None => Ok(FlowchartConfig::default()),
        }
    }

    fn print(content: &str) -> Result<()> {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(content.as_bytes())
            .and_then(|()| stdout.write_all(b"\n"))
            .context("failed to write to stdout")
    }

    fn print_json<T: Serialize>(value: &T) -> Result<()> {
        print(&serde_json::to_string_pretty(value)?)
    }

    #[derive(Serialize)]
    struct Assessment<'a> {
        findings: &'a [flowchart_core::Finding],
        feedback: &'a [String],
    }

    fn run() -> Result<()> {
        let cli = Cli::parse();
        init_tracing(cli.verbose, cli.quiet);

        let config = load_config(cli.config.as_ref())?;
        debug!(?config, "loaded configuration");
        let pipeline = Pipeline::new(config);

        match cli.command {
            Command::Decode { input } => {
                let source = load_input(&pipeline, &input)?;
                let xml = pipeline
                    .canonical_xml(&source)
                    .with_context(|| format!("decoding {input}"))?;
                print(&xml)
            }
            Command::Extract { input } => {
                let source = load_input(&pipeline, &input)?;
                let result = pipeline
                    .extract(&source)
                    .with_context(|| format!("extracting {input}"))?;
                info!(
                    nodes = result.nodes.len(),
                    edges = result.edges.len(),
                    "extracted"
                );
                print_json(&result)
            }
            Command::Analyze { input, text } => {
                let source = load_input(&pipeline, &input)?;
                let report = pipeline
                    .analyze(&source)
                    .with_context(|| format!("analyzing {input}"))?;
                let analysis = report
                    .analysis
                    .context("flowchart has connectors but no shapes")?;
                if text {
                    print(&analysis.issues.join("\n"))
                } else {
                    print_json(&analysis)
                }
            }
            Command::Assess { input, json } => {
                let source = load_input(&pipeline, &input)?;
                let report = pipeline
                    .analyze(&source)
                    .with_context(|| format!("assessing {input}"))?;
                if json {
                    return print_json(&Assessment {
                        findings: &report.findings,
                        feedback: &report.feedback,
                    });
                }
                let mut out = String::new();
                for finding in &report.findings {
                    out.push_str(&format!(
                        "{:?} {}: {}\n",
                        finding.severity, finding.rule_id, finding.message
                    ));
                }
                if !report.findings.is_empty() {
                    out.push('\n');
                }
                out.push_str(&report.feedback.join("\n"));
                print(&out)
            }
        }
    }

    pub fn main() {
        if let Err(err) = run() {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "cli")]
fn main() {
    real::main();
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("flowcheck requires `--features cli`");
    std::process::exit(2);
}
