// Copyright (c) 2025 GLATT HOME AUTOMATION
//
// This file is part of Glatt.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@glatt-home.dev

//! Bulk recompute of a smoothed destination series from its source history.
//!
//! The destination series is replaced wholesale: clear, recompute every
//! evaluation point through the same engine the live path uses, insert the
//! batch, re-aggregate, set the live value. The operation is not atomic; a
//! failure mid-way leaves the destination partially rewritten and reports
//! what happened.

use anyhow::{Context, Result};
use glatt_host::{Archive, HostError, VariableStore, VariableStoreExt};
use glatt_types::{Sample, SmoothingMethod, SourceScale, Trigger, sort_ascending};

use crate::engine::smooth;
use crate::normalize::normalize;

/// Archive range queries are capped, so retrieval is chunked.
pub const CHUNK_SECS: i64 = 24 * 60 * 60 * 30;

/// Parameters of one bulk recompute run.
#[derive(Debug, Clone)]
pub struct BulkRequest<'a> {
    pub source_id: &'a str,
    pub destination_id: &'a str,
    pub scale: SourceScale,
    pub method: SmoothingMethod,
    /// Number of prior samples per smoothed value
    pub capacity: usize,
    pub trigger: Trigger,
    /// Thinning interval for the cyclic trigger
    pub interval_secs: u32,
    /// Start of the source range, epoch seconds
    pub start: i64,
    /// End of the source range; `None` means now
    pub end: Option<i64>,
}

/// Outcome of a bulk recompute, presented to the invoking user.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    /// All steps ran; `false` means the run aborted at the first failure
    pub completed: bool,
    /// Destination points deleted before the rewrite
    pub deleted: u64,
    /// Destination points inserted
    pub inserted: usize,
    /// New live value of the destination, when one was produced
    pub end_value: Option<f64>,
    /// Human-readable progress and failure messages, in order
    pub messages: Vec<String>,
}

impl BulkReport {
    /// The accumulated messages as one displayable block.
    pub fn text(&self) -> String {
        self.messages.join("\n")
    }
}

/// Recompute the destination series over the requested source range.
///
/// Any failing step aborts the remaining steps; the partially rewritten
/// destination is left as-is and the report says how far the run got.
pub fn run_bulk_recompute(
    vars: &dyn VariableStore,
    archive: &dyn Archive,
    now: i64,
    req: &BulkRequest<'_>,
) -> BulkReport {
    let mut report = BulkReport::default();
    match run_inner(vars, archive, now, req, &mut report) {
        Ok(()) => report.completed = true,
        Err(err) => {
            tracing::warn!("bulk recompute of '{}' aborted: {err:#}", req.destination_id);
            report.messages.push(format!("{err:#}"));
        }
    }
    report
}

fn run_inner(
    vars: &dyn VariableStore,
    archive: &dyn Archive,
    now: i64,
    req: &BulkRequest<'_>,
    report: &mut BulkReport,
) -> Result<()> {
    let dest = req.destination_id;

    if !vars.exists(req.source_id) {
        anyhow::bail!("no source variable");
    }
    if !archive.logging_enabled(req.source_id) {
        anyhow::bail!("source variable isn't logged");
    }
    if !vars.exists(dest) {
        anyhow::bail!("missing destination variable \"{dest}\"");
    }
    if req.method.uses_interval() {
        anyhow::bail!("method '{}' is not supported for recalculation", req.method);
    }

    // Clear the live value first so consumers never see a stale reading
    // while the series is being rebuilt
    vars.write_f64(dest, 0.0)
        .with_context(|| format!("clear destination variable \"{dest}\" failed"))?;

    let deleted = archive
        .delete_range(dest, 0, now)
        .with_context(|| format!("delete from destination variable \"{dest}\" failed"))?;
    report.deleted = deleted;
    report
        .messages
        .push(format!("deleted all ({deleted}) from destination variable \"{dest}\""));

    let end = req.end.unwrap_or(now);
    let samples = collect_source_range(archive, req.source_id, req.start, end, &req.scale)
        .context("retrieving source series failed")?;
    tracing::debug!("{} log-entries of '{}'", samples.len(), req.source_id);

    let points = evaluation_points(&samples, req.capacity, req.trigger, req.interval_secs);
    if req.trigger == Trigger::Cyclic {
        tracing::debug!("{} log-entries, {} to be used", samples.len(), points.len());
    }

    let series = recompute_series(&samples, &points, req.method, req.capacity);

    let inserted = series.len();
    archive
        .insert_batch(dest, &series)
        .with_context(|| format!("add {inserted} values to destination variable \"{dest}\" failed"))?;
    report.inserted = inserted;
    report
        .messages
        .push(format!("added {inserted} values to destination variable \"{dest}\""));

    archive
        .reaggregate(dest)
        .with_context(|| format!("re-aggregate destination variable \"{dest}\" failed"))?;
    report
        .messages
        .push(format!("destination variable \"{dest}\" re-aggregated"));

    let live = vars
        .read_f64(req.source_id)
        .context("reading live source value failed")?;
    if let Some(end_value) = end_value(&samples, normalize(live, &req.scale), req.method, req.capacity)
    {
        vars.write_f64(dest, end_value)
            .with_context(|| format!("set destination variable \"{dest}\" failed"))?;
        report.end_value = Some(end_value);
    }

    Ok(())
}

/// Fetch the full source series over `[start, end]` in 30-day chunks,
/// sorted ascending and normalized.
pub fn collect_source_range(
    archive: &dyn Archive,
    source_id: &str,
    start: i64,
    end: i64,
    scale: &SourceScale,
) -> Result<Vec<Sample>, HostError> {
    let mut samples = Vec::new();
    let mut chunk_start = start;
    while chunk_start < end {
        let chunk_end = (chunk_start + CHUNK_SECS - 1).min(end);
        let chunk = archive.query(source_id, chunk_start, chunk_end, 0)?;
        tracing::debug!(
            "chunk [{chunk_start}, {chunk_end}] of '{source_id}': {} samples",
            chunk.len()
        );
        samples.extend(chunk);
        chunk_start = chunk_end + 1;
    }
    sort_ascending(&mut samples);
    for sample in &mut samples {
        sample.value = normalize(sample.value, scale);
    }
    Ok(samples)
}

/// Source indices at which the algorithm is applied.
///
/// Evaluation starts at index `capacity` so every window is full. The
/// cyclic trigger additionally thins the points: accept one, advance a
/// watermark by `interval_secs`, skip points before the watermark.
pub fn evaluation_points(
    samples: &[Sample],
    capacity: usize,
    trigger: Trigger,
    interval_secs: u32,
) -> Vec<usize> {
    let mut points = Vec::new();
    let mut watermark: i64 = 0;
    for i in capacity..samples.len() {
        if trigger == Trigger::Cyclic {
            if watermark != 0 && samples[i].timestamp < watermark {
                continue;
            }
            watermark = samples[i].timestamp + i64::from(interval_secs);
        }
        points.push(i);
    }
    points
}

/// One destination sample per evaluation point, through the incremental
/// engine: the trailing `capacity` samples form the window and the sample at
/// the point is the new value, so a replay matches the live series exactly.
pub fn recompute_series(
    samples: &[Sample],
    points: &[usize],
    method: SmoothingMethod,
    capacity: usize,
) -> Vec<Sample> {
    let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    let mut series = Vec::with_capacity(points.len());
    for &i in points {
        let window = &values[i - capacity..i];
        if let Some(value) = smooth(method, window, values[i], capacity) {
            series.push(Sample::new(samples[i].timestamp, value));
        }
    }
    series
}

/// The trailing live value of the destination: the newest `capacity` source
/// samples as window, the current live source reading as the new value.
pub fn end_value(
    samples: &[Sample],
    live_normalized: f64,
    method: SmoothingMethod,
    capacity: usize,
) -> Option<f64> {
    let tail_start = samples.len().saturating_sub(capacity);
    let window: Vec<f64> = samples[tail_start..].iter().map(|s| s.value).collect();
    smooth(method, &window, live_normalized, capacity)
}
