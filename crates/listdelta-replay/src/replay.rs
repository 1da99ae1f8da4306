#![forbid(unsafe_code)]

//! Drive an aggregator from trace records.

use std::io::{BufRead, Write};

use listdelta_core::{
    AggregatorConfig, AggregatorStats, BatchOutcome, BatchPlan, BatchTicket, ChangeSetAggregator,
    ItemIndex, PlanStep, SectionIndex, StepKind,
};
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::error::{ReplayError, Result};
use crate::trace::TraceRecord;

/// One plan step as printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub kind: StepKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<SectionIndex>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ItemIndex>,
}

impl StepReport {
    fn from_step(step: PlanStep<'_>) -> Self {
        let kind = step.kind();
        match step {
            PlanStep::DeleteSections(s) | PlanStep::InsertSections(s) | PlanStep::ReloadSections(s) => {
                Self {
                    kind,
                    sections: s.iter().copied().collect(),
                    items: Vec::new(),
                }
            }
            PlanStep::DeleteItems(i) | PlanStep::InsertItems(i) | PlanStep::ReloadItems(i) => Self {
                kind,
                sections: Vec::new(),
                items: i.to_vec(),
            },
        }
    }
}

/// One resolved batch as printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchReport {
    ReloadAll {
        epoch: u64,
    },
    Batch {
        epoch: u64,
        steps: Vec<StepReport>,
        reconfigure: Vec<ItemIndex>,
    },
}

impl BatchReport {
    fn batch(epoch: u64, plan: &BatchPlan) -> Self {
        Self::Batch {
            epoch,
            steps: plan.steps().map(StepReport::from_step).collect(),
            reconfigure: plan.reconfigure_items().to_vec(),
        }
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        match self {
            Self::ReloadAll { epoch } | Self::Batch { epoch, .. } => *epoch,
        }
    }
}

/// Aggregator plus the ticket of the batch the "surface" is applying.
#[derive(Debug)]
pub struct Replayer {
    aggregator: ChangeSetAggregator,
    in_flight: Option<BatchTicket>,
    /// The last `end` resolved to a full reload. A trace recorded in
    /// incremental mode still carries a `complete` for that batch.
    reloaded_last: bool,
    /// Line of the last record fed, reported by errors raised in `finish`.
    last_line: usize,
}

impl Replayer {
    #[must_use]
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            aggregator: ChangeSetAggregator::new(config),
            in_flight: None,
            reloaded_last: false,
            last_line: 0,
        }
    }

    pub fn aggregator(&self) -> &ChangeSetAggregator {
        &self.aggregator
    }

    #[must_use]
    pub fn last_line(&self) -> usize {
        self.last_line
    }

    /// Apply one record. `line` is 1-based and only used for errors.
    pub fn feed(&mut self, line: usize, record: TraceRecord) -> Result<Option<BatchReport>> {
        let seq = |source| ReplayError::Sequence { line, source };
        self.last_line = line;
        trace!(line, record = record.label(), "replay record");
        match record {
            TraceRecord::Begin => {
                self.aggregator.try_begin_batch().map_err(seq)?;
                self.reloaded_last = false;
                Ok(None)
            }
            TraceRecord::Event(event) => {
                self.aggregator.try_handle(event).map_err(seq)?;
                Ok(None)
            }
            TraceRecord::End => {
                let epoch = self.aggregator.epoch();
                let outcome = self.aggregator.try_end_batch().map_err(seq)?;
                self.reloaded_last = outcome.is_reload();
                Ok(Some(match outcome {
                    BatchOutcome::ReloadAll => BatchReport::ReloadAll { epoch },
                    BatchOutcome::Batch { plan, ticket } => {
                        let report = BatchReport::batch(epoch, &plan);
                        self.in_flight = Some(ticket);
                        report
                    }
                }))
            }
            TraceRecord::Complete { .. } if self.in_flight.is_none() && self.reloaded_last => {
                self.reloaded_last = false;
                debug!(line, "complete after full reload ignored");
                Ok(None)
            }
            TraceRecord::Complete { finished } => {
                let ticket = self.in_flight.take().ok_or_else(|| {
                    seq(listdelta_core::SequenceError::NotApplying {
                        phase: self.aggregator.phase(),
                    })
                })?;
                self.aggregator
                    .try_complete_batch(ticket, finished)
                    .map_err(seq)?;
                Ok(None)
            }
        }
    }

    /// Complete a batch left applying at end of input. Errors carry the
    /// line of the last record fed.
    pub fn finish(&mut self) -> Result<AggregatorStats> {
        if let Some(ticket) = self.in_flight.take() {
            let line = self.last_line;
            debug!(epoch = ticket.epoch(), line, "completing batch left open at end of trace");
            self.aggregator
                .try_complete_batch(ticket, true)
                .map_err(|source| ReplayError::Sequence { line, source })?;
        }
        Ok(self.aggregator.stats())
    }
}

/// Replay every line of `reader`, writing one JSON object per resolved batch.
pub fn replay<R, W>(
    config: AggregatorConfig,
    reader: R,
    mut out: W,
    pretty: bool,
) -> Result<AggregatorStats>
where
    R: BufRead,
    W: Write,
{
    let mut replayer = Replayer::new(config);
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let Some(record) = TraceRecord::parse_line(&line).map_err(|source| ReplayError::Parse {
            line: line_no,
            source,
        })?
        else {
            continue;
        };
        if let Some(report) = replayer.feed(line_no, record)? {
            write_report(&mut out, &report, pretty)?;
        }
    }
    let stats = replayer.finish()?;
    out.flush()?;
    info!(
        batches = stats.batches,
        reloads = stats.reloads,
        completed = stats.completed,
        events = stats.events,
        suppressed = stats.suppressed,
        "replay finished"
    );
    Ok(stats)
}

fn write_report<W: Write>(out: &mut W, report: &BatchReport, pretty: bool) -> Result<()> {
    let encoded = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
    .map_err(std::io::Error::from)?;
    writeln!(out, "{encoded}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use listdelta_core::{ChangeEvent, ItemUpdateMode, Phase, SequenceError};

    fn i(section: usize, item: usize) -> ItemIndex {
        ItemIndex::new(section, item)
    }

    fn run(config: AggregatorConfig, input: &str) -> Result<(Vec<serde_json::Value>, AggregatorStats)> {
        let mut out = Vec::new();
        let stats = replay(config, input.as_bytes(), &mut out, false)?;
        let text = String::from_utf8(out).unwrap();
        let values: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        Ok((values, stats))
    }

    #[test]
    fn batch_report_shape() {
        let input = r#"
{"kind":"begin"}
{"kind":"item_updated","index":{"section":0,"item":2}}
{"kind":"item_moved","from":{"section":0,"item":5},"to":{"section":1,"item":0}}
{"kind":"end"}
{"kind":"complete","finished":true}
"#;
        let (values, stats) = run(AggregatorConfig::default(), input).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(
            values[0],
            serde_json::json!({
                "outcome": "batch",
                "epoch": 1,
                "steps": [
                    {"kind": "delete_items", "items": [{"section": 0, "item": 5}]},
                    {"kind": "insert_items", "items": [{"section": 1, "item": 0}]},
                    {"kind": "reload_items", "items": [{"section": 0, "item": 2}]},
                ],
                "reconfigure": [],
            })
        );
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.completed, 1);
    }

    #[test]
    fn reload_report_shape() {
        let input = "{\"kind\":\"begin\"}\n{\"kind\":\"section_deleted\",\"section\":2}\n{\"kind\":\"end\"}\n";
        let (values, stats) = run(AggregatorConfig::default(), input).unwrap();
        assert_eq!(
            values,
            vec![serde_json::json!({"outcome": "reload_all", "epoch": 1})]
        );
        assert_eq!(stats.reloads, 1);
    }

    #[test]
    fn reconfigure_mode_moves_updates() {
        let input = "{\"kind\":\"begin\"}\n{\"kind\":\"item_updated\",\"index\":{\"section\":3,\"item\":1}}\n{\"kind\":\"end\"}\n";
        let (values, _) = run(AggregatorConfig::new(ItemUpdateMode::Reconfigure), input).unwrap();
        assert_eq!(values[0]["steps"], serde_json::json!([]));
        assert_eq!(
            values[0]["reconfigure"],
            serde_json::json!([{"section": 3, "item": 1}])
        );
    }

    #[test]
    fn open_batch_is_completed_at_end() {
        let mut replayer = Replayer::new(AggregatorConfig::default());
        replayer.feed(1, TraceRecord::Begin).unwrap();
        replayer
            .feed(2, TraceRecord::Event(ChangeEvent::ItemInserted { index: i(0, 0) }))
            .unwrap();
        assert!(replayer.feed(3, TraceRecord::End).unwrap().is_some());
        assert_eq!(replayer.aggregator().phase(), Phase::Applying);

        let stats = replayer.finish().unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(replayer.aggregator().phase(), Phase::Idle);
    }

    #[test]
    fn finish_tracks_the_last_record_line() {
        let mut replayer = Replayer::new(AggregatorConfig::default());
        assert_eq!(replayer.last_line(), 0);
        replayer.feed(4, TraceRecord::Begin).unwrap();
        assert!(replayer.feed(9, TraceRecord::End).unwrap().is_some());
        assert_eq!(replayer.last_line(), 9);

        // A ticket for batch 2 cannot settle batch 1.
        let mut other = ChangeSetAggregator::new(AggregatorConfig::default());
        for _ in 0..2 {
            other.begin_batch();
            let BatchOutcome::Batch { ticket, .. } = other.end_batch() else {
                panic!("empty batch should not reload");
            };
            if ticket.epoch() == 2 {
                replayer.in_flight = Some(ticket);
            } else {
                other.complete_batch(ticket, true);
            }
        }

        let err = replayer.finish().unwrap_err();
        assert!(matches!(
            err,
            ReplayError::Sequence {
                line: 9,
                source: SequenceError::StaleTicket {
                    expected: 1,
                    actual: 2
                }
            }
        ));
    }

    #[test]
    fn begin_before_completion_is_a_sequence_error() {
        let input = "{\"kind\":\"begin\"}\n{\"kind\":\"end\"}\n{\"kind\":\"begin\"}\n";
        let err = run(AggregatorConfig::default(), input).unwrap_err();
        assert!(matches!(
            err,
            ReplayError::Sequence {
                line: 3,
                source: SequenceError::BatchInFlight { epoch: 1 }
            }
        ));
    }

    #[test]
    fn stray_complete_is_a_sequence_error() {
        let err = run(AggregatorConfig::default(), "{\"kind\":\"complete\"}\n").unwrap_err();
        assert!(matches!(
            err,
            ReplayError::Sequence {
                line: 1,
                source: SequenceError::NotApplying { phase: Phase::Idle }
            }
        ));
    }

    #[test]
    fn complete_after_reload_is_ignored() {
        let input = "{\"kind\":\"begin\"}\n{\"kind\":\"end\"}\n{\"kind\":\"complete\"}\n{\"kind\":\"complete\"}\n";
        let config = AggregatorConfig::default().with_force_reload(true);
        let err = run(config, input).unwrap_err();
        assert!(matches!(err, ReplayError::Sequence { line: 4, .. }));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let input = "# header\n{\"kind\":\"begin\"}\n{oops\n";
        let err = run(AggregatorConfig::default(), input).unwrap_err();
        assert!(matches!(err, ReplayError::Parse { line: 3, .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn pretty_output_spans_lines() {
        let mut out = Vec::new();
        replay(
            AggregatorConfig::default(),
            "{\"kind\":\"begin\"}\n{\"kind\":\"end\"}\n".as_bytes(),
            &mut out,
            true,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().count() > 1);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["outcome"], "batch");
    }
}
