//! `reclaim`: offline checks and exports over a sites data file.
//!
//! Every subcommand drives the same `MapSession` the browser viewer uses,
//! backed by a `HeadlessMap`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use formats::sites::SitesDocument;
use foundation::ids::SiteId;
use scene::config::MapConfig;
use scene::map::HeadlessMap;
use scene::popup::popup_content;
use scene::search::SearchOutcome;
use scene::session::{MapSession, ResultRow};

#[derive(Debug, Parser)]
#[command(name = "reclaim", version, about = "Reclamation sites data tools")]
pub struct Cli {
    /// Map configuration JSON (partial documents fall back to defaults).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a data file and report what was accepted.
    Validate {
        data: PathBuf,
        /// Fail when any record was rejected or any name is duplicated.
        #[arg(long)]
        strict: bool,
    },
    /// Run the viewer's search against a data file.
    Search { data: PathBuf, query: String },
    /// Print a site's popup content as JSON.
    Popup { data: PathBuf, site: String },
    /// Export a site as KML.
    Kml {
        data: PathBuf,
        site: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Runs one command. `Ok(false)` means the command completed but the
/// process should exit non-zero.
pub fn run(cli: Cli, out: &mut dyn Write) -> Result<bool> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Validate { data, strict } => {
            let session = open_session(config, &data)?;
            cmd_validate(session, strict, out)
        }
        Command::Search { data, query } => {
            let (mut session, _) = open_session(config, &data)?;
            cmd_search(&mut session, &query, out)?;
            Ok(true)
        }
        Command::Popup { data, site } => {
            let (session, _) = open_session(config, &data)?;
            let id = resolve_site(&session, &site)?;
            let record = session
                .repository()
                .get(id)
                .with_context(|| format!("site {id} vanished"))?;
            let json = serde_json::to_string_pretty(&popup_content(id, record))?;
            writeln!(out, "{json}")?;
            Ok(true)
        }
        Command::Kml { data, site, output } => {
            let (session, _) = open_session(config, &data)?;
            let id = resolve_site(&session, &site)?;
            let doc = session
                .export_kml(id)
                .with_context(|| format!("site {id} vanished"))?;
            match output {
                Some(path) => {
                    fs::write(&path, &doc.contents)
                        .with_context(|| format!("write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "wrote {}", doc.file_name);
                }
                None => out.write_all(doc.contents.as_bytes())?,
            }
            Ok(true)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<MapConfig> {
    let Some(path) = path else {
        return Ok(MapConfig::default());
    };
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    MapConfig::from_json_str(&raw).with_context(|| format!("config {}", path.display()))
}

type Session = MapSession<HeadlessMap>;

fn open_session(
    config: MapConfig,
    data: &Path,
) -> Result<(Session, scene::repository::LoadReport)> {
    let raw = fs::read_to_string(data).with_context(|| format!("read {}", data.display()))?;
    let doc = SitesDocument::from_json_str(&raw)
        .with_context(|| format!("parse {}", data.display()))?;
    let mut session = MapSession::new(config, HeadlessMap::new());
    let report = session.load(doc)?;
    tracing::debug!(loaded = report.loaded, "opened {}", data.display());
    Ok((session, report))
}

fn cmd_validate(
    (session, report): (Session, scene::repository::LoadReport),
    strict: bool,
    out: &mut dyn Write,
) -> Result<bool> {
    writeln!(out, "sites: {}", session.repository().len())?;
    writeln!(out, "rejected: {}", report.rejected.len())?;
    for r in &report.rejected {
        match &r.name {
            Some(name) => writeln!(out, "  #{} ({name}): {}", r.index, r.reason)?,
            None => writeln!(out, "  #{}: {}", r.index, r.reason)?,
        }
    }
    writeln!(out, "duplicate names: {}", report.duplicate_names.len())?;
    for name in &report.duplicate_names {
        writeln!(out, "  {name}")?;
    }

    let clean = report.rejected.is_empty() && report.duplicate_names.is_empty();
    Ok(clean || !strict)
}

fn cmd_search(session: &mut Session, query: &str, out: &mut dyn Write) -> Result<()> {
    match session.update_query(query) {
        SearchOutcome::Inactive => writeln!(out, "inactive")?,
        SearchOutcome::Matches(set) if set.is_empty() => writeln!(out, "no results")?,
        SearchOutcome::Matches(set) => {
            for (index, (site, record)) in set.records(session.repository()).enumerate() {
                let row = ResultRow::new(index, site, record);
                writeln!(out, "{}\t{}\t{}", row.index, row.name, row.location)?;
            }
        }
    }
    Ok(())
}

/// Resolves a `<site>` argument: a load index, else an exact name (first match).
pub fn resolve_site(session: &Session, arg: &str) -> Result<SiteId> {
    let repo = session.repository();
    if let Ok(id) = arg.parse::<SiteId>() {
        if repo.get(id).is_some() {
            return Ok(id);
        }
    }
    match repo.find_marker_by_name(arg) {
        Some(binding) => Ok(binding.site),
        None => bail!("no site with index or name {arg:?}"),
    }
}
