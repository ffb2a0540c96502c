use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use colored::Colorize;
use docvault_index::{Index, NavigationRole, NodeHandle, NodeKind};
use docvault_store::{open_store, BlobStore, StoreConfig};
use docvault_verify::{
    AggregatingSink, CollectingSink, Verifier, VerifyConfig, VerifySummary, WriterSink,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cli::*;
use crate::config::CliConfig;

/// How a command that ran to completion wants the process to exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Completed, but found problems (exit status 1).
    Failure,
}

pub fn run_command(cli: Cli) -> anyhow::Result<Outcome> {
    let config = CliConfig::load(cli.config.as_deref())?.with_overrides(&cli);
    let format = cli.format;
    match cli.command {
        Command::Put(args) => cmd_put(&config, format, args),
        Command::Get(args) => cmd_get(&config, args),
        Command::Ls => cmd_ls(&config, format),
        Command::Tree(args) => cmd_tree(&config, format, args),
        Command::Resolve(args) => cmd_resolve(&config, format, args),
        Command::Verify(args) => cmd_verify(&config, format, args),
    }
}

fn open_writable(config: &CliConfig) -> anyhow::Result<Box<dyn BlobStore>> {
    open_store(&config.store)
        .with_context(|| format!("opening store {}", config.store.path.display()))
}

/// Every command except `put` only reads.
fn open_readable(config: &CliConfig) -> anyhow::Result<Box<dyn BlobStore>> {
    let store_config = StoreConfig {
        read_only: true,
        ..config.store.clone()
    };
    open_store(&store_config)
        .with_context(|| format!("opening store {}", store_config.path.display()))
}

fn load_index(config: &CliConfig) -> anyhow::Result<Index> {
    Index::load_file(&config.index_path)
        .with_context(|| format!("loading index {}", config.index_path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Store commands
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PutEntry {
    path: PathBuf,
    id: String,
    bytes: usize,
}

/// Files named directly, plus every file below named directories, sorted.
fn collect_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.with_context(|| format!("walking {}", path.display()))?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn cmd_put(config: &CliConfig, format: OutputFormat, args: PutArgs) -> anyhow::Result<Outcome> {
    let store = open_writable(config)?;
    let mut entries = Vec::new();
    for file in collect_files(&args.paths)? {
        let data = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
        let id = store
            .add_object(&data)
            .with_context(|| format!("storing {}", file.display()))?;
        debug!(path = %file.display(), %id, "stored");
        entries.push(PutEntry {
            path: file,
            id: id.to_hex(),
            bytes: data.len(),
        });
    }

    match format {
        OutputFormat::Text => {
            for entry in &entries {
                println!("{} {}", entry.id.yellow(), entry.path.display());
            }
            println!("{} Stored {} objects", "✓".green().bold(), entries.len());
        }
        OutputFormat::Json => print_json(&entries)?,
    }
    Ok(Outcome::Success)
}

fn cmd_get(config: &CliConfig, args: GetArgs) -> anyhow::Result<Outcome> {
    let store = open_readable(config)?;
    let data = store
        .get_object_hex(&args.id)
        .with_context(|| format!("fetching {}", args.id))?;
    match &args.output {
        Some(path) => {
            fs::write(path, &data).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), bytes = data.len(), "object written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
    }
    Ok(Outcome::Success)
}

fn cmd_ls(config: &CliConfig, format: OutputFormat) -> anyhow::Result<Outcome> {
    let store = open_readable(config)?;
    let ids: Vec<String> = store
        .object_ids()
        .context("listing objects")?
        .iter()
        .map(|id| id.to_hex())
        .collect();
    match format {
        OutputFormat::Text => {
            for id in &ids {
                println!("{id}");
            }
        }
        OutputFormat::Json => print_json(&ids)?,
    }
    Ok(Outcome::Success)
}

// ---------------------------------------------------------------------------
// Index commands
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct NodeReport {
    node: NodeHandle,
    kind: NodeKind,
    depth: usize,
    address: String,
    ids: Vec<String>,
    title: String,
    tags: Vec<String>,
    content_id: Option<String>,
}

fn node_report(
    index: &Index,
    handle: NodeHandle,
    depth: usize,
    preferred_doc_id: &str,
) -> Option<NodeReport> {
    index.node(handle).map(|node| NodeReport {
        node: handle,
        kind: node.kind(),
        depth,
        address: index.node_address(handle, preferred_doc_id),
        ids: node.ids().to_vec(),
        title: node.title().to_string(),
        tags: node.tags().to_vec(),
        content_id: node.content_id().map(str::to_string),
    })
}

impl NodeReport {
    fn display_address(&self) -> &str {
        if self.address.is_empty() {
            "/"
        } else {
            &self.address
        }
    }

    fn print_line(&self, indent: usize) {
        let kind = match self.kind {
            NodeKind::Document => self.kind.to_string().cyan().bold(),
            NodeKind::Page => self.kind.to_string().normal(),
        };
        let mut line = format!(
            "{}{kind} {} {}",
            "  ".repeat(indent),
            self.display_address().yellow(),
            self.title.bold()
        );
        if self.ids.len() > 1 {
            line.push_str(&format!(" [{}]", self.ids[1..].join(", ")));
        }
        if let Some(content) = &self.content_id {
            line.push_str(&format!(" {}", content.dimmed()));
        }
        println!("{line}");
    }
}

fn cmd_tree(config: &CliConfig, format: OutputFormat, args: TreeArgs) -> anyhow::Result<Outcome> {
    let index = load_index(config)?;
    let (start, doc_id) = match &args.address {
        Some(address) => {
            let found = index.resolve_address(address)?;
            (found.node, found.doc_id)
        }
        None => (index.root(), String::new()),
    };
    let base = index.depth(start);
    let reports: Vec<NodeReport> = index
        .node_children(start, args.depth.unwrap_or(usize::MAX), true)
        .into_iter()
        .filter_map(|(depth, handle)| node_report(&index, handle, base + depth, &doc_id))
        .collect();

    match format {
        OutputFormat::Text => {
            if reports.is_empty() {
                println!("{}", "(no nodes)".dimmed());
            }
            for report in &reports {
                report.print_line(report.depth - base - 1);
            }
        }
        OutputFormat::Json => print_json(&reports)?,
    }
    Ok(Outcome::Success)
}

#[derive(Serialize)]
struct NeighbourReport {
    role: NavigationRole,
    #[serde(flatten)]
    node: NodeReport,
}

#[derive(Serialize)]
struct VersionReport {
    document: NodeReport,
    address: String,
}

fn cmd_resolve(
    config: &CliConfig,
    format: OutputFormat,
    args: ResolveArgs,
) -> anyhow::Result<Outcome> {
    let index = load_index(config)?;
    let found = index.resolve_address(&args.address)?;
    let doc_id = found.doc_id.as_str();
    let report_of = |handle: NodeHandle| node_report(&index, handle, index.depth(handle), doc_id);

    let target = report_of(found.node)
        .with_context(|| format!("{} resolved to an unknown node", args.address))?;
    let navigation: Vec<NeighbourReport> = index
        .navigation_context(found.node)
        .entries()
        .filter_map(|(role, handle)| report_of(handle).map(|node| NeighbourReport { role, node }))
        .collect();
    let children: Vec<NodeReport> = index
        .node_children(found.node, args.depth, false)
        .into_iter()
        .filter_map(|(_, handle)| report_of(handle))
        .collect();
    let versions: Vec<VersionReport> = index
        .related_versions(found.node)
        .into_iter()
        .filter_map(|version| {
            let document = node_report(&index, version.document, index.depth(version.document), "")?;
            Some(VersionReport {
                address: index.node_address(version.node, ""),
                document,
            })
        })
        .collect();

    match format {
        OutputFormat::Text => {
            target.print_line(0);
            if !found.doc_id.is_empty() {
                println!("  entered via: {}", found.doc_id.cyan());
            }
            if !target.tags.is_empty() {
                println!("  tags: {}", target.tags.join(", "));
            }
            if !navigation.is_empty() {
                println!("{}", "Navigation:".bold());
                for entry in &navigation {
                    print!("  {:<18}", entry.role.as_str());
                    entry.node.print_line(0);
                }
            }
            if !children.is_empty() {
                println!("{}", "Children:".bold());
                for child in &children {
                    child.print_line(child.depth - target.depth);
                }
            }
            if !versions.is_empty() {
                println!("{}", "Versions:".bold());
                for version in &versions {
                    println!(
                        "  {} {}",
                        version.address.yellow(),
                        format!("({})", version.document.title).dimmed()
                    );
                }
            }
        }
        OutputFormat::Json => print_json(&json!({
            "node": target,
            "doc_id": found.doc_id,
            "navigation": navigation,
            "children": children,
            "versions": versions,
        }))?,
    }
    Ok(Outcome::Success)
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// File settings with the `verify` flags applied.
fn verify_config(config: &CliConfig, args: VerifyArgs) -> VerifyConfig {
    let mut verify = config.verify.clone();
    if args.aggregate {
        verify.aggregate = true;
    }
    if !args.kinds.is_empty() {
        verify.enabled = args.kinds;
    }
    if let Some(min) = args.min_severity {
        verify.min_severity = min;
    }
    verify
}

fn cmd_verify(
    config: &CliConfig,
    format: OutputFormat,
    args: VerifyArgs,
) -> anyhow::Result<Outcome> {
    let index = load_index(config)?;
    let store = open_readable(config)?;
    let settings = verify_config(config, args);
    let verifier = Verifier::from_config(&settings);

    let summary = match (format, settings.aggregate) {
        (OutputFormat::Text, false) => {
            let mut sink = WriterSink::new(io::stdout().lock());
            let summary = verifier.verify(&index, store.as_ref(), &mut sink);
            drop(sink.finish().context("writing messages")?);
            print_summary(&summary);
            summary
        }
        (OutputFormat::Text, true) => {
            let mut sink = AggregatingSink::new();
            let summary = verifier.verify(&index, store.as_ref(), &mut sink);
            sink.write_report(io::stdout().lock())
                .context("writing report")?;
            print_summary(&summary);
            summary
        }
        (OutputFormat::Json, false) => {
            let mut sink = CollectingSink::new();
            let summary = verifier.verify(&index, store.as_ref(), &mut sink);
            print_json(&json!({ "messages": sink.messages(), "summary": summary }))?;
            summary
        }
        (OutputFormat::Json, true) => {
            let mut sink = AggregatingSink::new();
            let summary = verifier.verify(&index, store.as_ref(), &mut sink);
            print_json(&json!({ "groups": sink.report(), "summary": summary }))?;
            summary
        }
    };

    Ok(if summary.has_errors() {
        Outcome::Failure
    } else {
        Outcome::Success
    })
}

fn print_summary(summary: &VerifySummary) {
    let mark = if summary.has_errors() {
        "✗".red().bold()
    } else {
        "✓".green().bold()
    };
    println!(
        "{mark} {} nodes: {} errors, {} warnings, {} info ({} suppressed)",
        summary.nodes,
        summary.errors.to_string().red(),
        summary.warnings.to_string().yellow(),
        summary.infos,
        summary.suppressed
    );
}
