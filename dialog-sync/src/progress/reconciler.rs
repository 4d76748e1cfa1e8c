//! Merge of remote progress reports into the local aggregate.

use tracing::{debug, info};

use super::aggregate::ProgressAggregate;
use crate::remote::{ActivityEntry, ActivityType, RemoteProgressReport};

/// Merge `report` into `existing`.
///
/// Id sets only grow. Completion flags and points describe the report
/// alone: they are cleared and then set from the entries present, so a
/// sub-task missing from the report counts as incomplete. A report without
/// activities leaves `existing` untouched.
pub fn merge(report: &RemoteProgressReport, existing: Option<&ProgressAggregate>) -> ProgressAggregate {
    let mut aggregate = existing.cloned().unwrap_or_default();

    let activities = report.activities();
    if activities.is_empty() {
        info!(dialog_id = ?report.dialog_id, "Progress report without activities, keeping prior state");
        return aggregate;
    }

    for task in [
        &mut aggregate.watch,
        &mut aggregate.learn,
        &mut aggregate.speak,
        &mut aggregate.chat,
    ] {
        task.complete = false;
    }
    aggregate.total_points = report.total_points.unwrap_or(0);

    for entry in activities {
        apply_entry(&mut aggregate, entry);
    }

    if let Some(hash) = &report.hash {
        aggregate.hash = Some(hash.to_string());
    }
    aggregate
}

fn apply_entry(aggregate: &mut ProgressAggregate, entry: &ActivityEntry) {
    let Some(kind) = entry.activity_type() else {
        debug!(code = ?entry.activity_type_id, "Ignoring unknown activity type");
        return;
    };
    match kind {
        ActivityType::Watch | ActivityType::WatchComprehension => {
            aggregate.watch.complete = entry.completed;
            aggregate
                .watch
                .ids
                .union_with(entry.watched_dialog_lines.iter().map(|l| l.dialog_line_id.as_str()));
        }
        ActivityType::Learn => {
            aggregate.learn.complete = entry.completed;
            aggregate.learn.ids.union_with(
                entry
                    .learned_dialog_lines
                    .iter()
                    .flat_map(|line| &line.learned_words)
                    .filter(|word| word.completed)
                    .map(|word| word.word_head_id.as_str()),
            );
        }
        ActivityType::Speak => {
            aggregate.speak.complete = entry.completed;
            aggregate
                .speak
                .ids
                .union_with(entry.spoken_dialog_lines.iter().map(|l| l.dialog_line_id.as_str()));
        }
        ActivityType::Chat => {
            aggregate.chat.complete = entry.completed;
            aggregate
                .chat
                .ids
                .union_with(entry.submitted_question_ids.iter().map(|id| id.as_str()));
        }
    }
}
