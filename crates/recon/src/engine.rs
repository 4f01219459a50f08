use crate::error::ReconError;
use crate::model::{
    BatchSummary, Millis, Observation, ObservationOutcome, RejectReason, Route, ScanSource,
};
use crate::normalize::normalize;
use crate::registry::Registry;
use crate::resolver::{find_owning_route, migrate_stale_references, purge_except};
use crate::scan_csv::ScanCsv;

/// Current wall clock in epoch milliseconds.
pub fn now_millis() -> Millis {
    chrono::Utc::now().timestamp_millis()
}

/// Normalize raw scanner/CSV input, then observe it.
pub fn observe_raw_at(
    registry: &mut Registry,
    raw: &str,
    source: ScanSource,
    at: Millis,
) -> Observation {
    match normalize(raw) {
        Some(id) => observe_at(registry, &id, source, at),
        None => Observation::rejected(raw.trim(), RejectReason::InvalidIdentifier),
    }
}

/// Classify `id` against the selected route and record it at `at`.
///
/// `id` must already be canonical (see [`normalize`]). Rejections leave the
/// registry untouched.
pub fn observe_at(registry: &mut Registry, id: &str, source: ScanSource, at: Millis) -> Observation {
    if id.is_empty() || normalize(id).as_deref() != Some(id) {
        return Observation::rejected(id, RejectReason::InvalidIdentifier);
    }
    let Some(current_id) = registry.current_id().map(str::to_string) else {
        return Observation::rejected(id, RejectReason::NoRouteSelected);
    };
    if !registry.contains(&current_id) {
        return Observation::rejected(id, RejectReason::UnknownRoute(current_id));
    }

    let source = registry.effective_source(source);

    // Ownership only matters once there is another route to confuse it with
    let owner = if registry.len() > 1 {
        find_owning_route(registry, id)
    } else {
        None
    };

    if owner.as_deref() == Some(current_id.as_str()) {
        let touched = migrate_stale_references(registry, id, &current_id);
        if touched > 0 {
            log::info!("{id}: cleared stale entries from {touched} other route(s)");
        }
    }

    let Some(route) = registry.get_mut(&current_id) else {
        return Observation::rejected(id, RejectReason::UnknownRoute(current_id));
    };
    let outcome = classify(route, id, at, owner);

    if let ObservationOutcome::OffRoute { owner: Some(ref owner_id) } = outcome {
        if *owner_id != current_id {
            purge_except(registry, id, &[owner_id.as_str(), current_id.as_str()]);
        }
    }

    let alert = source == ScanSource::Scanner
        && matches!(
            outcome,
            ObservationOutcome::Duplicate { .. } | ObservationOutcome::OffRoute { .. }
        );

    log::debug!("route {current_id}: {id} -> {}", outcome.as_str());

    Observation {
        id: id.to_string(),
        outcome,
        alert,
        changed: true,
    }
}

/// The per-route state transition. `owner` is the resolver's answer, used
/// only to annotate off-route outcomes.
pub fn classify(route: &mut Route, id: &str, at: Millis, owner: Option<String>) -> ObservationOutcome {
    if route.verified.contains(id) || route.off_route.contains(id) {
        let total_reads = route.duplicate_counts.get(id).copied().unwrap_or(1) + 1;
        route.duplicate_counts.insert(id.to_string(), total_reads);
        route.last_seen_at.insert(id.to_string(), at);
        return ObservationOutcome::Duplicate { total_reads };
    }

    if route.expected.remove(id) {
        route.verified.insert(id.to_string());
        route.last_seen_at.insert(id.to_string(), at);
        return ObservationOutcome::Verified;
    }

    route.off_route.insert(id.to_string());
    route.last_seen_at.insert(id.to_string(), at);
    ObservationOutcome::OffRoute { owner }
}

/// Run a whole scan-result CSV against the selected route.
///
/// The file is parsed and the selection checked before the first
/// observation, so a bad file mutates nothing.
pub fn check_csv(registry: &mut Registry, csv_text: &str, at: Millis) -> Result<BatchSummary, ReconError> {
    let scan = ScanCsv::parse(csv_text)?;
    registry.require_current()?;

    let mut batch = registry.begin_csv_batch();
    for value in &scan.values {
        batch.observe_raw(value, at);
    }
    Ok(batch.finish())
}
