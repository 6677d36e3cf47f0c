//! Streaming record parser
//!
//! Walks the export with a pull reader and yields one [`ElementOutcome`] per candidate
//! element. Once a `Record` has been examined its subtree is skipped, and a `Workout` is
//! scanned once for its energy total and nested records, so memory stays bounded by a single
//! element regardless of document size.

use quick_xml::{
    events::{BytesStart, Event},
    name::QName,
    Reader,
};
use std::{
    collections::VecDeque,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};
use tracing::trace;

use super::{
    error::{DropReason, ImportError, Result},
    models::{
        duration_minutes, parse_timestamp, parse_value, ElementOutcome, MeasurementKind,
        NormalizedRecord, SLEEP_UNIT,
    },
};

const RECORD: &[u8] = b"Record";
const WORKOUT: &[u8] = b"Workout";
const TOTAL_ENERGY_BURNED: &[u8] = b"TotalEnergyBurned";

const READ_BUFFER_BYTES: usize = 256 * 1024;

/// Attributes of interest on a candidate element
#[derive(Debug, Default)]
struct ElementAttrs {
    kind: Option<String>,
    value: Option<String>,
    unit: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

enum Candidate {
    Record(ElementAttrs),
    Workout(ElementAttrs),
    Other(Vec<u8>),
}

enum WorkoutChild {
    Record(ElementAttrs),
    Energy(ElementAttrs),
    Other,
}

/// Lazy, single-pass iterator over the candidate elements of an export.
///
/// Yields `Ok(outcome)` per allow-listed record, wherever it is nested, and per workout with
/// an energy child. A syntax error yields one `Err` and ends the iteration.
pub struct RecordParser<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    /// Names of open container elements, used to detect truncated documents
    open: Vec<Vec<u8>>,
    /// Outcomes found while scanning a workout, yielded before reading further
    pending: VecDeque<ElementOutcome>,
    finished: bool,
}

impl RecordParser<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::with_capacity(READ_BUFFER_BYTES, file)))
    }
}

impl<R: BufRead> RecordParser<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: Reader::from_reader(reader),
            buf: Vec::with_capacity(1024),
            open: Vec::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn next_outcome(&mut self) -> Result<Option<ElementOutcome>> {
        loop {
            if let Some(outcome) = self.pending.pop_front() {
                return Ok(Some(outcome));
            }

            self.buf.clear();
            let (candidate, has_children) = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => (classify(&e), true),
                Ok(Event::Empty(e)) => (classify(&e), false),
                Ok(Event::End(_)) => {
                    self.open.pop();
                    continue;
                }
                Ok(Event::Eof) => {
                    return match self.open.pop() {
                        Some(name) => Err(xml_error(&self.reader, missing_end_tag(&name))),
                        None => Ok(None),
                    };
                }
                Ok(_) => continue,
                Err(e) => return Err(xml_error(&self.reader, e)),
            };
            let candidate = candidate.map_err(|e| xml_error(&self.reader, e))?;

            match candidate {
                Candidate::Record(attrs) => {
                    if has_children {
                        self.skip_subtree(RECORD)?;
                    }
                    if let Some(outcome) = record_outcome(&attrs) {
                        return Ok(Some(outcome));
                    }
                }
                Candidate::Workout(attrs) => {
                    let energy = if has_children {
                        self.scan_workout()?
                    } else {
                        None
                    };
                    // Records nested in the workout are already queued ahead of its energy
                    if let Some(energy) = energy {
                        self.pending
                            .push_back(into_outcome(workout_record(&attrs, &energy)));
                    }
                }
                Candidate::Other(name) => {
                    if has_children {
                        self.open.push(name);
                    }
                }
            }
        }
    }

    fn skip_subtree(&mut self, name: &[u8]) -> Result<()> {
        self.buf.clear();
        self.reader
            .read_to_end_into(QName(name), &mut self.buf)
            .map(|_| ())
            .map_err(|e| xml_error(&self.reader, e))
    }

    /// Consume a workout's subtree.
    ///
    /// `Record`s at any depth are queued in document order. Returns the attributes of the
    /// first direct `TotalEnergyBurned` child.
    fn scan_workout(&mut self) -> Result<Option<ElementAttrs>> {
        let mut energy = None;
        let mut depth = 0usize;
        loop {
            self.buf.clear();
            let (child, has_children) = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => (workout_child(&e, depth == 0 && energy.is_none()), true),
                Ok(Event::Empty(e)) => (workout_child(&e, depth == 0 && energy.is_none()), false),
                Ok(Event::End(_)) if depth == 0 => return Ok(energy),
                Ok(Event::End(_)) => {
                    depth -= 1;
                    continue;
                }
                Ok(Event::Eof) => return Err(xml_error(&self.reader, missing_end_tag(WORKOUT))),
                Ok(_) => continue,
                Err(e) => return Err(xml_error(&self.reader, e)),
            };

            match child.map_err(|e| xml_error(&self.reader, e))? {
                WorkoutChild::Record(attrs) => {
                    if has_children {
                        self.skip_subtree(RECORD)?;
                    }
                    if let Some(outcome) = record_outcome(&attrs) {
                        self.pending.push_back(outcome);
                    }
                }
                WorkoutChild::Energy(attrs) => {
                    energy = Some(attrs);
                    if has_children {
                        depth += 1;
                    }
                }
                WorkoutChild::Other => {
                    if has_children {
                        depth += 1;
                    }
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for RecordParser<R> {
    type Item = Result<ElementOutcome>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_outcome() {
            Ok(Some(outcome)) => Some(Ok(outcome)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

fn xml_error<R>(reader: &Reader<R>, source: quick_xml::Error) -> ImportError {
    ImportError::Xml {
        position: reader.buffer_position() as u64,
        source,
    }
}

fn missing_end_tag(name: &[u8]) -> quick_xml::Error {
    quick_xml::Error::IllFormed(quick_xml::errors::IllFormedError::MissingEndTag(
        String::from_utf8_lossy(name).into_owned(),
    ))
}

fn classify(element: &BytesStart<'_>) -> std::result::Result<Candidate, quick_xml::Error> {
    Ok(match element.name().as_ref() {
        RECORD => Candidate::Record(collect_attrs(element)?),
        WORKOUT => Candidate::Workout(collect_attrs(element)?),
        other => Candidate::Other(other.to_vec()),
    })
}

/// `want_energy` is true only for direct children while no energy element has been seen
fn workout_child(
    element: &BytesStart<'_>,
    want_energy: bool,
) -> std::result::Result<WorkoutChild, quick_xml::Error> {
    Ok(match element.name().as_ref() {
        RECORD => WorkoutChild::Record(collect_attrs(element)?),
        TOTAL_ENERGY_BURNED if want_energy => WorkoutChild::Energy(collect_attrs(element)?),
        _ => WorkoutChild::Other,
    })
}

fn collect_attrs(element: &BytesStart<'_>) -> std::result::Result<ElementAttrs, quick_xml::Error> {
    let mut attrs = ElementAttrs::default();
    for attr in element.attributes() {
        let attr = attr?;
        let slot = match attr.key.as_ref() {
            b"type" => &mut attrs.kind,
            b"value" => &mut attrs.value,
            b"unit" => &mut attrs.unit,
            b"startDate" => &mut attrs.start_date,
            b"endDate" => &mut attrs.end_date,
            _ => continue,
        };
        *slot = Some(attr.unescape_value()?.into_owned());
    }
    Ok(attrs)
}

fn required<'a>(
    value: &'a Option<String>,
    name: &'static str,
) -> std::result::Result<&'a str, DropReason> {
    value.as_deref().ok_or(DropReason::MissingAttribute(name))
}

fn into_outcome(result: std::result::Result<NormalizedRecord, DropReason>) -> ElementOutcome {
    match result {
        Ok(record) => ElementOutcome::Accepted(record),
        Err(reason) => {
            trace!(%reason, "Dropped candidate element");
            ElementOutcome::Dropped(reason)
        }
    }
}

/// `None` when the record's type is not allow-listed
fn record_outcome(attrs: &ElementAttrs) -> Option<ElementOutcome> {
    let kind = MeasurementKind::from_identifier(attrs.kind.as_deref()?)?;
    let result = if kind.is_sleep() {
        sleep_record(attrs)
    } else {
        quantity_record(kind, attrs)
    };
    Some(into_outcome(result))
}

fn quantity_record(
    kind: MeasurementKind,
    attrs: &ElementAttrs,
) -> std::result::Result<NormalizedRecord, DropReason> {
    let value = parse_value(required(&attrs.value, "value")?)?;
    let start_date = parse_timestamp(required(&attrs.start_date, "startDate")?)?;

    Ok(NormalizedRecord {
        record_type: kind.as_str().to_string(),
        unit: attrs.unit.clone(),
        value,
        start_date,
    })
}

/// Sleep intervals are stored as `(stage, "min", minutes, start)`
fn sleep_record(attrs: &ElementAttrs) -> std::result::Result<NormalizedRecord, DropReason> {
    let stage = required(&attrs.value, "value")?;
    let start_date = parse_timestamp(required(&attrs.start_date, "startDate")?)?;
    let end_date = parse_timestamp(required(&attrs.end_date, "endDate")?)?;

    Ok(NormalizedRecord {
        record_type: stage.to_string(),
        unit: Some(SLEEP_UNIT.to_string()),
        value: duration_minutes(start_date, end_date),
        start_date,
    })
}

/// A workout's energy total is stored as an active energy record at the workout start
fn workout_record(
    workout: &ElementAttrs,
    energy: &ElementAttrs,
) -> std::result::Result<NormalizedRecord, DropReason> {
    let value = parse_value(required(&energy.value, "value")?)?;
    let start_date = parse_timestamp(required(&workout.start_date, "startDate")?)?;

    Ok(NormalizedRecord {
        record_type: MeasurementKind::ActiveEnergyBurned.as_str().to_string(),
        unit: energy.unit.clone(),
        value,
        start_date,
    })
}
