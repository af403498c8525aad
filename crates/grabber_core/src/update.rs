use crate::{
    intermediary_builds, merge, normalize_range, ChangeRequest, ChangeSet, CoordinationState,
    Effect, Msg, PageKind,
};

/// Pure update function: applies a message to state and returns any effects.
///
/// Every page load is one call with the persisted state as input, so the
/// machine resumes correctly after a reload or a process restart.
pub fn update(mut state: CoordinationState, msg: Msg) -> (CoordinationState, Vec<Effect>) {
    let effects = match msg {
        Msg::PageLoaded(kind) => on_page_loaded(&mut state, kind),
        Msg::ChangesRequested(request) => {
            return start_run(state, request);
        }
        Msg::ResetClicked => {
            state = CoordinationState::new();
            Vec::new()
        }
        Msg::VisitOpened => {
            state.visit_in_flight = true;
            Vec::new()
        }
        Msg::VisitClosed => {
            state.visit_in_flight = false;
            Vec::new()
        }
        Msg::AllVisitsClosed => {
            if state.aggregate.is_some() {
                state.ready_to_export = true;
            }
            vec![Effect::ReloadOrigin]
        }
        Msg::DepotAnchorFound { manifest_id } => {
            // First visited page wins.
            if state.manifest_id.is_none() && state.visit_in_flight {
                state.manifest_id = manifest_id;
            }
            Vec::new()
        }
        Msg::DiffExtracted { entries } => {
            if state.visit_in_flight {
                if let Some(aggregate) = state.aggregate.take() {
                    state.aggregate = Some(merge(aggregate, &entries));
                }
            }
            vec![Effect::ClosePage]
        }
        Msg::DepotMissing | Msg::ExtractionTimedOut | Msg::PageFailed => vec![Effect::ClosePage],
        Msg::ExportWritten => {
            state.ready_to_export = false;
            Vec::new()
        }
    };

    (state, effects)
}

fn on_page_loaded(state: &mut CoordinationState, kind: PageKind) -> Vec<Effect> {
    match kind {
        PageKind::Patchnotes { .. } if state.visit_in_flight => {
            match (&state.depot_id, &state.aggregate) {
                (Some(depot_id), Some(_)) => vec![Effect::ExtractDiff {
                    depot_id: depot_id.clone(),
                }],
                // Nothing to aggregate into; end the visit so the queue moves.
                _ => vec![Effect::ClosePage],
            }
        }
        PageKind::App { .. } if state.ready_to_export => match &state.aggregate {
            Some(aggregate) => vec![Effect::Export {
                changes: aggregate.clone().with_manifest(state.manifest_id.clone()),
            }],
            None => {
                state.ready_to_export = false;
                Vec::new()
            }
        },
        PageKind::App { .. } | PageKind::Patchnotes { .. } | PageKind::Other => Vec::new(),
    }
}

fn start_run(state: CoordinationState, request: ChangeRequest) -> (CoordinationState, Vec<Effect>) {
    let range = match normalize_range(
        &request.depot_id,
        &request.build_from,
        &request.build_to,
        &request.listing,
    ) {
        Ok(range) => range,
        Err(err) => return (state, vec![Effect::RejectRequest(err)]),
    };

    let builds = intermediary_builds(&request.listing, &range);
    let aggregate = ChangeSet::new(
        &request.app,
        request.depot_id.clone(),
        range.from.clone(),
        range.to.clone(),
    );
    let next = CoordinationState {
        aggregate: Some(aggregate),
        depot_id: Some(request.depot_id.clone()),
        manifest_id: None,
        visit_in_flight: false,
        ready_to_export: false,
    };

    let mut effects = Vec::with_capacity(2);
    if range.swapped {
        effects.push(Effect::SelectionSwapped {
            from: range.from,
            to: range.to,
        });
    }
    effects.push(Effect::BeginVisits {
        depot_id: request.depot_id,
        builds,
    });
    (next, effects)
}
