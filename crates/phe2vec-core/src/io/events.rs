//! Patient event CSV.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use phe2vec_types::{ClinicalEvent, PatientTimeline};

use super::{open, validate_headers};
use crate::types::Phe2VecResult;

const EVENT_COLUMNS: &[&str] = &["patient_id", "concept_id", "age_in_days"];

/// One row of the events file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Patient the event belongs to.
    pub patient_id: String,
    /// Concept recorded.
    pub concept_id: String,
    /// Patient age at the event, in days.
    pub age_in_days: u32,
}

/// Reads patient timelines from an events CSV file.
///
/// # Errors
/// Returns an error if the file is missing, has unexpected columns, or a
/// row cannot be parsed.
pub fn read_events<P: AsRef<Path>>(path: P) -> Phe2VecResult<Vec<PatientTimeline>> {
    let path = path.as_ref();
    let timelines = read_events_from(open(path)?)?;
    tracing::info!(
        "Loaded {} patients from {}",
        timelines.len(),
        path.display()
    );
    Ok(timelines)
}

/// Reads patient timelines from events CSV data.
///
/// Patients keep the order of their first row; each timeline is sorted by
/// age, keeping file order among events of the same day.
pub fn read_events_from<R: Read>(reader: R) -> Phe2VecResult<Vec<PatientTimeline>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    validate_headers(csv_reader.headers()?, EVENT_COLUMNS)?;

    let mut timelines: Vec<PatientTimeline> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut events = 0usize;

    for result in csv_reader.deserialize() {
        let record: EventRecord = result?;
        let position = *positions.entry(record.patient_id.clone()).or_insert_with(|| {
            timelines.push(PatientTimeline::new(record.patient_id.clone(), Vec::new()));
            timelines.len() - 1
        });
        timelines[position]
            .events
            .push(ClinicalEvent::new(record.concept_id, record.age_in_days));
        events += 1;
    }

    for timeline in &mut timelines {
        timeline.sort_chronologically();
    }
    tracing::debug!(events, patients = timelines.len(), "Parsed events");
    Ok(timelines)
}

/// Writes timelines as events CSV.
pub fn write_events_to<W: Write>(writer: W, timelines: &[PatientTimeline]) -> Phe2VecResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for timeline in timelines {
        for event in &timeline.events {
            csv_writer.serialize(EventRecord {
                patient_id: timeline.patient_id.clone(),
                concept_id: event.concept.clone(),
                age_in_days: event.age_in_days,
            })?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}
