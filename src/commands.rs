use crate::{emit_success, OutputMode, SchemaFormat};
use anyhow::Context;
use lexbridge::config::{self, BridgeConfig, TargetConfig};
use lexbridge::store::{self, Backend};
use lexbridge::stream::{FieldValue, RecordSource};
use lexbridge::ui::{
    backend_icon, counts_table, header, info, resolution_warnings, section, success, summary_row,
    timing, ProgressSink, Spinner, TableBuilder,
};
use lexbridge::{model, Decoded, Decoder, Encoder, ResolutionMode, Schema, TypeRegistry};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

pub fn run_schema(output_mode: OutputMode, format: SchemaFormat) -> anyhow::Result<()> {
    let registry = model::registry()?;
    let schema = Schema::derive(&registry);
    let text = match format {
        SchemaFormat::Sql => schema.to_sql(),
        SchemaFormat::Layout => schema.to_layout(),
    };

    if output_mode.is_human() {
        header("Storage schema");
        info("Fingerprint", &schema.fingerprint());
        println!();
        println!("{}", text);
    } else {
        let data = serde_json::json!({
            "format": match format {
                SchemaFormat::Sql => "sql",
                SchemaFormat::Layout => "layout",
            },
            "fingerprint": schema.fingerprint(),
            "text": text,
        });
        emit_success(output_mode, "schema", data)?;
    }
    Ok(())
}

pub fn run_convert(
    output_mode: OutputMode,
    cfg: &BridgeConfig,
    input: &Path,
    output: Option<PathBuf>,
    resolution: Option<ResolutionMode>,
    batch_size: Option<usize>,
    force: bool,
) -> anyhow::Result<()> {
    let mode = cfg.resolution_or(resolution)?;
    let (out_backend, out_path) = resolve_target(cfg, output)?;
    let batch_size = batch_size.unwrap_or(cfg.batch_size);
    if batch_size == 0 {
        anyhow::bail!("--batch-size must be at least 1");
    }
    if input == out_path.as_path() {
        anyhow::bail!("input and output are the same file: {}", input.display());
    }

    let in_backend = Backend::from_path(input);
    if output_mode.is_human() {
        header(&format!(
            "{} {} -> {} {}",
            backend_icon(in_backend),
            input.display(),
            backend_icon(out_backend),
            out_path.display()
        ));
        info("Resolution", mode.as_str());
    }

    let started = Instant::now();
    let registry = model::registry()?;
    let decoded = decode_store(in_backend, input, &registry, mode, output_mode)?;

    prepare_output(&out_path, force)?;
    let sink = store::create_sink(out_backend, &out_path, Arc::clone(&registry), batch_size)
        .with_context(|| format!("creating {}", out_path.display()))?;
    let mut sink = ProgressSink::new(sink, "Encoding");
    let written = lexbridge::pipeline::pump_pipelined(
        Encoder::new(&decoded.graph),
        &mut sink,
        cfg.queue_capacity,
    )?;
    let elapsed = started.elapsed();

    if output_mode.is_human() {
        sink.finish_with_summary(elapsed);
        resolution_warnings(&decoded.warnings);
        section("Summary");
        summary_row("Records read", &decoded.stats.records.to_string());
        summary_row("Records written", &written.to_string());
        summary_row("References resolved", &decoded.stats.resolved.to_string());
        summary_row("References dropped", &decoded.stats.dropped.to_string());
        summary_row("Nodes pruned", &decoded.stats.pruned.to_string());
        timing(&format!("{:.2?}", elapsed));
    } else {
        let data = serde_json::json!({
            "input": { "backend": in_backend, "path": input },
            "output": { "backend": out_backend, "path": out_path },
            "resolution": mode,
            "written": written,
            "stats": decoded.stats,
            "warnings": decoded.warnings,
            "elapsed_ms": elapsed.as_millis() as u64,
        });
        emit_success(output_mode, "convert", data)?;
    }
    Ok(())
}

pub fn run_check(
    output_mode: OutputMode,
    cfg: &BridgeConfig,
    input: &Path,
    resolution: Option<ResolutionMode>,
) -> anyhow::Result<()> {
    let mode = cfg.resolution_or(resolution)?;
    let backend = Backend::from_path(input);
    if output_mode.is_human() {
        header(&format!("Checking {} {}", backend_icon(backend), input.display()));
    }

    let registry = model::registry()?;
    let decoded = decode_store(backend, input, &registry, mode, output_mode)?;
    let graph_stats = decoded.graph.stats();

    if output_mode.is_human() {
        if decoded.warnings.is_empty() {
            success("All references resolved");
        } else {
            resolution_warnings(&decoded.warnings);
        }
        let mut table = TableBuilder::new();
        table.add_row("Records", decoded.stats.records);
        table.add_row("Roots", graph_stats.roots);
        table.add_row("References", decoded.stats.references);
        table.add_row("Resolved", decoded.stats.resolved);
        table.add_row("Dropped", decoded.stats.dropped);
        table.add_row("Pruned", decoded.stats.pruned);
        println!("{}", table.build());
    } else {
        let data = serde_json::json!({
            "input": input,
            "resolution": mode,
            "stats": decoded.stats,
            "per_type": graph_stats.per_type,
            "warnings": decoded.warnings,
        });
        emit_success(output_mode, "check", data)?;
    }
    Ok(())
}

/// Counts straight off the record stream; nothing is resolved
pub fn run_stats(output_mode: OutputMode, input: &Path) -> anyhow::Result<()> {
    let backend = Backend::from_path(input);
    let registry = model::registry()?;
    let mut source = store::open_source(backend, input, Arc::clone(&registry))
        .with_context(|| format!("opening {}", input.display()))?;

    let mut per_type: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut records = 0usize;
    let mut references = 0usize;
    let mut max_depth = 0usize;
    while let Some(record) = source.next_record()? {
        records += 1;
        max_depth = max_depth.max(record.depth);
        *per_type.entry(record.entity).or_insert(0) += 1;
        for field in &record.fields {
            references += match &field.value {
                FieldValue::Reference(r) => usize::from(r.target().is_some()),
                FieldValue::References(targets) => targets.len(),
                _ => 0,
            };
        }
    }

    if output_mode.is_human() {
        header(&format!("{} {}", backend_icon(backend), input.display()));
        println!("{}", counts_table(&per_type));
        let mut table = TableBuilder::new();
        table.add_row("Records", records);
        table.add_row("References", references);
        table.add_row("Max depth", max_depth);
        println!("{}", table.build());
    } else {
        let data = serde_json::json!({
            "input": input,
            "backend": backend,
            "records": records,
            "references": references,
            "max_depth": max_depth,
            "per_type": per_type,
        });
        emit_success(output_mode, "stats", data)?;
    }
    Ok(())
}

pub fn run_sample(
    output_mode: OutputMode,
    cfg: &BridgeConfig,
    output: Option<PathBuf>,
    force: bool,
) -> anyhow::Result<()> {
    let (backend, path) = resolve_target(cfg, output)?;
    let registry = model::registry()?;
    let mut graph = model::sample_graph(Arc::clone(&registry))?;
    graph.link(ResolutionMode::Strict)?;

    prepare_output(&path, force)?;
    let started = Instant::now();
    let sink = store::create_sink(backend, &path, Arc::clone(&registry), cfg.batch_size)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut sink = ProgressSink::new(sink, "Writing sample");
    let written =
        lexbridge::pipeline::pump_pipelined(Encoder::new(&graph), &mut sink, cfg.queue_capacity)?;

    if output_mode.is_human() {
        sink.finish_with_summary(started.elapsed());
        info("Written to", &format!("{} {}", backend_icon(backend), path.display()));
    } else {
        let data = serde_json::json!({
            "backend": backend,
            "path": path,
            "written": written,
        });
        emit_success(output_mode, "sample", data)?;
    }
    Ok(())
}

pub fn run_init(output_mode: OutputMode, path: &Path, force: bool) -> anyhow::Result<()> {
    let cfg = BridgeConfig {
        resolution: Some(ResolutionMode::Strict),
        target: Some(TargetConfig {
            backend: Backend::Sqlite,
            location: PathBuf::from("lexicon.db"),
            credentials: None,
        }),
        ..BridgeConfig::default()
    };
    config::write_config(path, &cfg, force)?;

    if output_mode.is_human() {
        success(&format!("Wrote {}", path.display()));
    } else {
        emit_success(output_mode, "init", serde_json::json!({ "path": path }))?;
    }
    Ok(())
}

/// Explicit output path, else the config's `[target]`
fn resolve_target(cfg: &BridgeConfig, output: Option<PathBuf>) -> anyhow::Result<(Backend, PathBuf)> {
    match (output, &cfg.target) {
        (Some(path), _) => Ok((Backend::from_path(&path), path)),
        (None, Some(target)) => Ok((target.backend, target.location.clone())),
        (None, None) => anyhow::bail!("no output given: pass --output or add a [target] section to the config"),
    }
}

fn prepare_output(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() {
        if !force {
            anyhow::bail!("{} already exists (use --force to replace it)", path.display());
        }
        std::fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    }
    config::ensure_parent_dir(path)
}

fn decode_store(
    backend: Backend,
    path: &Path,
    registry: &Arc<TypeRegistry>,
    mode: ResolutionMode,
    output_mode: OutputMode,
) -> anyhow::Result<Decoded> {
    let spinner = output_mode
        .is_human()
        .then(|| Spinner::new(&format!("Decoding {}", path.display())));
    let mut source = store::open_source(backend, path, Arc::clone(registry))
        .with_context(|| format!("opening {}", path.display()))?;
    let decoded = Decoder::new(Arc::clone(registry), mode).decode(&mut source);
    if let Some(spinner) = spinner {
        spinner.clear();
    }
    let decoded = decoded.with_context(|| format!("decoding {}", path.display()))?;
    tracing::info!("Decoded {} records from {}", decoded.stats.records, path.display());
    Ok(decoded)
}
