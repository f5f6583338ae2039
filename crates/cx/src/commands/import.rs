//! `cx import` -- ingest parser output as JSON lines.
//!
//! Each line is one record tagged with a `record` field: `entity`,
//! `dependency`, `file`, or `coverage`. Entities without an explicit id
//! get a content-addressed one. Dependencies are grouped by source and
//! replace that entity's outgoing edge set, matching scan semantics.

use std::collections::BTreeMap;
use std::io::Read;

use anyhow::{bail, Context as _, Result};
use chrono::Utc;
use serde::Deserialize;

use cortex_core::dependency::Dependency;
use cortex_core::entity::{CoverageRecord, Entity, FileIndexEntry};
use cortex_core::enums::{DepType, EntityKind, EntityStatus, Visibility};
use cortex_core::idgen;
use cortex_storage::Store;

use crate::cli::ImportArgs;
use crate::context::RuntimeContext;

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "record", rename_all = "lowercase")]
enum ImportRecord {
    Entity(EntityRecord),
    Dependency(DependencyRecord),
    File(FileRecord),
    Coverage(CoverageInRecord),
}

#[derive(Debug, Deserialize)]
struct EntityRecord {
    #[serde(default)]
    id: Option<String>,
    name: String,
    entity_type: String,
    file_path: String,
    #[serde(default)]
    line_start: Option<u32>,
    #[serde(default)]
    line_end: Option<u32>,
    #[serde(default)]
    signature: String,
    #[serde(default)]
    visibility: Option<String>,
    #[serde(default)]
    language: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DependencyRecord {
    from_id: String,
    to_id: String,
    #[serde(rename = "type")]
    dep_type: String,
}

#[derive(Debug, Deserialize)]
struct FileRecord {
    file_path: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    content_hash: String,
}

#[derive(Debug, Deserialize)]
struct CoverageInRecord {
    entity_id: String,
    coverage_percent: f64,
    #[serde(default)]
    lines_covered: i64,
    #[serde(default)]
    lines_total: i64,
    #[serde(default)]
    source_tag: String,
}

fn parse_enum<T>(value: &str, what: &str, parser: impl Fn(&str) -> Option<T>) -> Result<T> {
    match parser(value) {
        Some(parsed) => Ok(parsed),
        None => bail!("invalid argument: unknown {what} {value:?}"),
    }
}

impl EntityRecord {
    fn into_entity(self) -> Result<Entity> {
        let kind = parse_enum(&self.entity_type, "entity type", EntityKind::parse)?;
        let visibility = match self.visibility.as_deref() {
            Some(v) => parse_enum(v, "visibility", Visibility::parse)?,
            None => Visibility::Private,
        };
        let status = match self.status.as_deref() {
            Some(s) => parse_enum(s, "status", EntityStatus::parse)?,
            None => EntityStatus::Active,
        };
        let id = self
            .id
            .unwrap_or_else(|| idgen::entity_id(kind, &self.file_path, &self.name, &self.signature));
        let now = Utc::now();
        Ok(Entity {
            id,
            name: self.name,
            entity_type: kind,
            file_path: self.file_path,
            line_start: self.line_start,
            line_end: self.line_end,
            signature: self.signature,
            visibility,
            language: self.language,
            status,
            created_at: now,
            updated_at: now,
        })
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

pub fn run(ctx: &RuntimeContext, args: &ImportArgs) -> Result<()> {
    let input = if args.input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read {}", args.input))?
    };

    let mut entities: Vec<Entity> = Vec::new();
    let mut deps_by_from: BTreeMap<String, Vec<Dependency>> = BTreeMap::new();
    let mut files: Vec<FileIndexEntry> = Vec::new();
    let mut coverage: Vec<CoverageRecord> = Vec::new();

    for (line_no, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: ImportRecord = serde_json::from_str(line)
            .with_context(|| format!("invalid record on line {}", line_no + 1))?;
        match record {
            ImportRecord::Entity(e) => entities.push(e.into_entity()?),
            ImportRecord::Dependency(d) => {
                let dep_type = parse_enum(&d.dep_type, "dependency type", DepType::parse)?;
                deps_by_from
                    .entry(d.from_id.clone())
                    .or_default()
                    .push(Dependency::new(d.from_id, d.to_id, dep_type));
            }
            ImportRecord::File(f) => files.push(FileIndexEntry {
                file_path: f.file_path,
                language: f.language,
                last_scanned: Utc::now(),
                content_hash: f.content_hash,
            }),
            ImportRecord::Coverage(c) => coverage.push(CoverageRecord {
                entity_id: c.entity_id,
                coverage_percent: c.coverage_percent,
                lines_covered: c.lines_covered,
                lines_total: c.lines_total,
                source_tag: c.source_tag,
            }),
        }
    }

    let (_cx_dir, _lock, store) = ctx.open_store_for_write()?;

    store
        .create_entities_bulk(&entities, args.upsert)
        .context("failed to import entities")?;
    let dep_count: usize = deps_by_from.values().map(Vec::len).sum();
    for (from_id, deps) in &deps_by_from {
        store
            .replace_dependencies_from(from_id, deps)
            .with_context(|| format!("failed to import dependencies of {from_id}"))?;
    }
    for file in &files {
        store.upsert_file(file).context("failed to import file index")?;
    }
    for record in &coverage {
        store
            .save_coverage(record)
            .context("failed to import coverage")?;
    }

    if ctx.json {
        crate::output::print_json(&serde_json::json!({
            "entities": entities.len(),
            "dependencies": dep_count,
            "files": files.len(),
            "coverage": coverage.len(),
        }))?;
    } else if !ctx.quiet {
        println!(
            "Imported {} entities, {} dependencies, {} files, {} coverage records",
            entities.len(),
            dep_count,
            files.len(),
            coverage.len()
        );
    }
    Ok(())
}
